//! §4.4's "straightforward reductions over `forEach`" — `values`, `keys`,
//! `keysValues`, `map`, `filter`, `every`, `some`, `reduce`. Kept in their
//! own module because none of them touch the engine's internal state; each
//! is a small fold over the public `for_each` walk.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::item::{Item, Key};
use crate::map::OrderedMap;

impl<V> OrderedMap<V> {
    pub fn values(&self) -> Result<Vec<Rc<V>>> {
        let mut out = Vec::with_capacity(self.len()?);
        self.for_each(false, |_, item| {
            out.push(item.value.clone());
            true
        })?;
        Ok(out)
    }

    pub fn keys(&self) -> Result<Vec<Key>> {
        let mut out = Vec::with_capacity(self.len()?);
        self.for_each(false, |_, item| {
            out.push(item.key.clone());
            true
        })?;
        Ok(out)
    }

    pub fn keys_values(&self) -> Result<Vec<Item<V>>> {
        let mut out = Vec::with_capacity(self.len()?);
        self.for_each(false, |_, item| {
            out.push(item.clone());
            true
        })?;
        Ok(out)
    }

    /// Applies `f(index, item)` to every live entry, collecting results in
    /// forward order.
    pub fn map<T, F>(&self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(usize, &Item<V>) -> T,
    {
        let mut out = Vec::with_capacity(self.len()?);
        self.for_each(false, |index, item| {
            out.push(f(index, item));
            true
        })?;
        Ok(out)
    }

    pub fn filter<F>(&self, mut f: F) -> Result<Vec<Item<V>>>
    where
        F: FnMut(usize, &Item<V>) -> bool,
    {
        let mut out = Vec::new();
        self.for_each(false, |index, item| {
            if f(index, item) {
                out.push(item.clone());
            }
            true
        })?;
        Ok(out)
    }

    /// `true` iff `f` holds for every entry, or the map is empty. Short
    /// circuits on the first `false`.
    pub fn every<F>(&self, mut f: F) -> Result<bool>
    where
        F: FnMut(usize, &Item<V>) -> bool,
    {
        let mut all = true;
        self.for_each(false, |index, item| {
            if !f(index, item) {
                all = false;
                false
            } else {
                true
            }
        })?;
        Ok(all)
    }

    /// `true` iff `f` holds for at least one entry. Short circuits on the
    /// first `true`.
    pub fn some<F>(&self, mut f: F) -> Result<bool>
    where
        F: FnMut(usize, &Item<V>) -> bool,
    {
        let mut any = false;
        self.for_each(false, |index, item| {
            if f(index, item) {
                any = true;
                false
            } else {
                true
            }
        })?;
        Ok(any)
    }

    /// `reduce` with an explicit seed.
    pub fn reduce<A, F>(&self, initial: A, mut f: F) -> Result<A>
    where
        F: FnMut(A, usize, &Item<V>) -> A,
    {
        let mut acc = Some(initial);
        self.for_each(false, |index, item| {
            acc = Some(f(acc.take().unwrap(), index, item));
            true
        })?;
        Ok(acc.unwrap())
    }

    /// `reduce` with no seed: the first entry's value is the seed and `f`
    /// is applied starting from the second entry, matching §8 scenario 8's
    /// "skip-first" rule. Errors on an empty map.
    pub fn reduce_no_seed<F>(&self, mut f: F) -> Result<Rc<V>>
    where
        F: FnMut(Rc<V>, usize, &Item<V>) -> Rc<V>,
    {
        if self.len()? == 0 {
            return Err(Error::ReduceEmptyNoInitialValue);
        }
        let mut acc: Option<Rc<V>> = None;
        self.for_each(false, |index, item| {
            acc = Some(match acc.take() {
                None => item.value.clone(),
                Some(prev) => f(prev, index, item),
            });
            true
        })?;
        Ok(acc.unwrap())
    }
}

#[cfg(test)]
mod iter_test {
    use super::*;
    use crate::map::{MapConfig, OrderedMap};

    fn item(k: i64, v: i64) -> Item<i64> {
        Item::new(Key::Int(k), v)
    }

    fn sample() -> OrderedMap<i64> {
        OrderedMap::new_root(
            MapConfig::default(),
            vec![item(1, 1), item(2, 2), item(3, 3)],
        )
    }

    #[test]
    fn keys_values_and_values_preserve_order() {
        let m = sample();
        assert_eq!(m.keys().unwrap(), vec![Key::Int(1), Key::Int(2), Key::Int(3)]);
        assert_eq!(
            m.values().unwrap().iter().map(|v| **v).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn map_filter_every_some() {
        let m = sample();
        let doubled = m.map(|_, item| *item.value * 2).unwrap();
        assert_eq!(doubled, vec![2, 4, 6]);

        let odd = m.filter(|_, item| *item.value % 2 == 1).unwrap();
        assert_eq!(odd.len(), 2);

        assert!(m.every(|_, item| *item.value > 0).unwrap());
        assert!(!m.every(|_, item| *item.value > 1).unwrap());
        assert!(m.some(|_, item| *item.value == 2).unwrap());
        assert!(!m.some(|_, item| *item.value == 99).unwrap());
    }

    #[test]
    fn reduce_with_and_without_seed() {
        let m = sample();
        let sum = m.reduce(0i64, |acc, _, item| acc + *item.value).unwrap();
        assert_eq!(sum, 6);

        let sum_no_seed = m
            .reduce_no_seed(|acc, _, item| Rc::new(*acc + *item.value))
            .unwrap();
        assert_eq!(*sum_no_seed, 6);

        let empty = OrderedMap::<i64>::new_root(MapConfig::default(), vec![]);
        let err = empty
            .reduce_no_seed(|acc, _, item| Rc::new(*acc + *item.value))
            .unwrap_err();
        assert_eq!(err, Error::ReduceEmptyNoInitialValue);
    }
}
