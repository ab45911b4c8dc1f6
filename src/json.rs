//! §6's JSON collaborator: `to_json`/`from_json`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{Item, Key};
use crate::map::{MapConfig, Mode, OrderedMap};

/// Failure of the JSON collaborator: either the core engine's own gate
/// error (a lightweight-mode map used after its one mutation) or a
/// malformed/mistyped blob. Kept separate from [`crate::error::Error`]
/// because the core's failure model (§4.4) only covers the core, not this
/// external collaborator.
#[derive(Debug)]
pub enum JsonError {
    Map(crate::error::Error),
    Json(serde_json::Error),
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonError::Map(e) => write!(f, "{e}"),
            JsonError::Json(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for JsonError {}

impl From<crate::error::Error> for JsonError {
    fn from(e: crate::error::Error) -> JsonError {
        JsonError::Map(e)
    }
}

impl From<serde_json::Error> for JsonError {
    fn from(e: serde_json::Error) -> JsonError {
        JsonError::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, JsonError>;

#[derive(Serialize)]
struct WireItemRef<'a, V> {
    key: Key,
    value: &'a V,
}

#[derive(Serialize)]
struct WireMapRef<'a, V> {
    key_prop_name: &'a str,
    keys_values: Vec<WireItemRef<'a, V>>,
}

#[derive(Deserialize)]
struct WireItem<V> {
    key: Key,
    value: V,
}

#[derive(Deserialize)]
struct WireMap<V> {
    key_prop_name: String,
    keys_values: Vec<WireItem<V>>,
}

/// Emit `{"keyPropName": ..., "keysValues": [{"key":..., "value":...}, ...]}`.
pub fn to_json<V>(map: &OrderedMap<V>) -> Result<String>
where
    V: Serialize,
{
    let mut keys_values = Vec::with_capacity(map.len()?);
    map.for_each(false, |_, item| {
        keys_values.push(WireItemRef {
            key: item.key.clone(),
            value: &*item.value,
        });
        true
    })?;

    Ok(serde_json::to_string(&WireMapRef {
        key_prop_name: map.key_prop_name(),
        keys_values,
    })?)
}

/// Rebuild a map from a `to_json` blob, reusing the blob's `keyPropName`
/// and the caller-supplied `mode` (the wire format does not carry mode,
/// matching §6: `fromJSON` "rebuilds via the lazy factory").
pub fn from_json<V>(blob: &str, mode: Mode) -> Result<OrderedMap<V>>
where
    V: for<'de> Deserialize<'de> + PartialEq,
{
    let wire: WireMap<V> = serde_json::from_str(blob)?;
    let items = wire
        .keys_values
        .into_iter()
        .map(|wi| Item::new(wi.key, wi.value))
        .collect::<Vec<Item<V>>>();
    Ok(OrderedMap::new_root(
        MapConfig {
            key_prop_name: wire.key_prop_name,
            mode,
            lazy: false,
        },
        items,
    ))
}

#[cfg(test)]
mod json_test {
    use super::*;
    use crate::map::MapConfig;

    #[test]
    fn round_trip_preserves_order_and_values() {
        let m = OrderedMap::new_root(
            MapConfig::default(),
            vec![
                Item::new(Key::Int(1), "a".to_string()),
                Item::new(Key::Int(2), "b".to_string()),
            ],
        );
        let blob = to_json(&m).unwrap();
        let back: OrderedMap<String> = from_json(&blob, Mode::Multiway).unwrap();
        assert_eq!(back.keys_values().unwrap().len(), m.keys_values().unwrap().len());
        assert_eq!(*back.get(&Key::Int(1)).unwrap().unwrap(), "a");
        assert_eq!(*back.get(&Key::Int(2)).unwrap().unwrap(), "b");
    }
}
