//! `Key` and `Item`, the primitive key and the {key, value} pair the rest of
//! the crate is built around. Grounded on `rdms::types`'s one-file-per-type
//! convention, collapsed here because the key alphabet is closed (string or
//! integer) rather than open-ended like `rdms`'s `Ord`-bound generic keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// A map key: either a string or a 64-bit integer.
///
/// `Ord` is derived only so keys can be sorted in diagnostics; the map
/// itself never orders by key (insertion order only, per the Non-goals).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Str(String),
    Int(i64),
}

impl Key {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s.as_str()),
            Key::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(n) => Some(*n),
            Key::Str(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{s}"),
            Key::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Key {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Key {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Key {
        Key::Int(n)
    }
}

/// A {key, value} pair as observed by a caller. `value` is reference
/// counted so the same payload can be shared between a node and whatever
/// produced it, and so "identity-equal" (the source's `===`) can be tested
/// cheaply with [`Rc::ptr_eq`] before falling back to `PartialEq`.
#[derive(Debug)]
pub struct Item<V> {
    pub key: Key,
    pub value: Rc<V>,
}

impl<V> Clone for Item<V> {
    fn clone(&self) -> Self {
        Item {
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

impl<V> Item<V> {
    pub fn new(key: Key, value: V) -> Item<V> {
        Item {
            key,
            value: Rc::new(value),
        }
    }

    pub fn from_rc(key: Key, value: Rc<V>) -> Item<V> {
        Item { key, value }
    }
}

/// Two items are identity-equal exactly when the spec's `===` would hold:
/// same key, and same value either by pointer or by `PartialEq`.
pub fn values_identity_equal<V: PartialEq>(a: &Rc<V>, b: &Rc<V>) -> bool {
    Rc::ptr_eq(a, b) || **a == **b
}
