//! §6's lazy-proxy collaborator, externalized per the REDESIGN FLAGS note:
//! Rust has no transparent proxying, so initialization is folded into an
//! explicit [`LazyMap::materialize`] call, cheap after the first use.

use std::cell::RefCell;

use crate::item::Item;
use crate::map::{MapConfig, OrderedMap};

enum LazyState<V> {
    Pending(MapConfig, Vec<Item<V>>),
    Ready(OrderedMap<V>),
}

/// A map whose population is deferred until first use. `pre_len` reports
/// the eventual length before that happens, matching the source's
/// "`length` is pre-set to `initialItems.length`" contract.
pub struct LazyMap<V> {
    pre_len: usize,
    state: RefCell<LazyState<V>>,
}

impl<V> LazyMap<V> {
    pub fn new(config: MapConfig, initial_items: Vec<Item<V>>) -> LazyMap<V> {
        LazyMap {
            pre_len: initial_items.len(),
            state: RefCell::new(LazyState::Pending(config, initial_items)),
        }
    }

    pub fn pre_len(&self) -> usize {
        self.pre_len
    }

    pub fn is_materialized(&self) -> bool {
        matches!(&*self.state.borrow(), LazyState::Ready(_))
    }

    /// Real map population happens here, once; every call site in
    /// `OrderedMap`'s public API is expected to call this first.
    pub fn materialize(&self) -> OrderedMap<V>
    where
        V: PartialEq,
    {
        let mut state = self.state.borrow_mut();
        let built = if let LazyState::Pending(config, items) = &mut *state {
            Some(OrderedMap::new_root(
                std::mem::take(config),
                std::mem::take(items),
            ))
        } else {
            None
        };
        match built {
            Some(map) => {
                *state = LazyState::Ready(map.clone());
                map
            }
            None => match &*state {
                LazyState::Ready(map) => map.clone(),
                LazyState::Pending(..) => unreachable!(),
            },
        }
    }
}

#[cfg(test)]
mod lazy_test {
    use super::*;
    use crate::item::Key;

    #[test]
    fn pre_len_reported_before_materialization() {
        let lazy = LazyMap::new(
            MapConfig::default(),
            vec![Item::new(Key::Int(1), "a"), Item::new(Key::Int(2), "b")],
        );
        assert_eq!(lazy.pre_len(), 2);
        assert!(!lazy.is_materialized());

        let map = lazy.materialize();
        assert_eq!(map.len().unwrap(), 2);
        assert!(lazy.is_materialized());
    }

    #[test]
    fn materialize_is_idempotent() {
        let lazy = LazyMap::new(MapConfig::default(), vec![Item::new(Key::Int(1), "a")]);
        let first = lazy.materialize();
        let second = lazy.materialize();
        assert_eq!(first.len().unwrap(), second.len().unwrap());
    }
}
