//! §4.2 — the heap index: the shared, process-internal store that maps
//! `key → (depth → …)` and resolves "which node is current for this
//! (version, key)".
//!
//! One `HeapIndex` is created at the root of a lineage and shared by `Rc`
//! across every descendant map forked from it (§5: the only shared mutable
//! state in the whole engine). It grows monotonically in single/multiway
//! modes and overwrites in place in lightweight mode, matching I7.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::item::Key;
use crate::linked::LinkedOrderedMap;
use crate::map::Mode;
use crate::node::{NodeRef, Version};

enum Slot<V> {
    Single(LinkedOrderedMap<usize, NodeRef<V>>),
    Multiway(LinkedOrderedMap<usize, LinkedOrderedMap<Version, NodeRef<V>>>),
    Lightweight(NodeRef<V>),
}

pub struct HeapIndex<V> {
    mode: Mode,
    table: RefCell<HashMap<Key, Slot<V>>>,
}

pub type SharedHeap<V> = Rc<HeapIndex<V>>;

impl<V> HeapIndex<V> {
    pub fn new(mode: Mode) -> SharedHeap<V> {
        Rc::new(HeapIndex {
            mode,
            table: RefCell::new(HashMap::new()),
        })
    }

    /// Record `node` as the entry for `key` at `(depth, version)`. Single
    /// and multiway modes prepend a new depth layer (append-only); every
    /// write within one mutation call shares the same `depth`, so repeated
    /// updates to the same key during one call simply overwrite that
    /// layer's entry rather than growing it (see `map.rs`'s batched `set`).
    pub fn update(&self, key: Key, depth: usize, version: Option<&Version>, node: NodeRef<V>) {
        let mut table = self.table.borrow_mut();
        match self.mode {
            Mode::Single => match table.get_mut(&key) {
                Some(Slot::Single(layer)) => layer.set(depth, node, true),
                _ => {
                    let mut layer = LinkedOrderedMap::new();
                    layer.set(depth, node, true);
                    table.insert(key, Slot::Single(layer));
                }
            },
            Mode::Multiway => {
                let version = version.cloned().unwrap_or_else(Version::root);
                match table.get_mut(&key) {
                    Some(Slot::Multiway(layer)) => match layer.get_mut(&depth) {
                        Some(stack) => stack.set(version, node, true),
                        None => {
                            let mut stack = LinkedOrderedMap::new();
                            stack.set(version, node, true);
                            layer.set(depth, stack, true);
                        }
                    },
                    _ => {
                        let mut stack = LinkedOrderedMap::new();
                        stack.set(version, node, true);
                        let mut layer = LinkedOrderedMap::new();
                        layer.set(depth, stack, true);
                        table.insert(key, Slot::Multiway(layer));
                    }
                }
            }
            Mode::Lightweight => {
                table.insert(key, Slot::Lightweight(node));
            }
        }
    }

    /// Resolve the node current for `(key, depth, version)`, or `None` if
    /// there is no entry at all, or the newest visible entry is an orphan
    /// tombstone (I5: an orphan shadows older entries rather than falling
    /// through to them).
    pub fn lookup(&self, key: &Key, depth: usize, version: Option<&Version>) -> Option<NodeRef<V>> {
        let table = self.table.borrow();
        let found = match table.get(key)? {
            Slot::Single(layer) => {
                let mut found = None;
                layer.for_each(|&d, node| {
                    if d <= depth {
                        found = Some(node.clone());
                        false
                    } else {
                        true
                    }
                });
                found
            }
            Slot::Multiway(layer) => {
                let version = version.cloned().unwrap_or_else(Version::root);
                let mut found = None;
                layer.for_each(|&d, stack| {
                    if d > depth {
                        return true;
                    }
                    let mut hit = None;
                    stack.for_each(|v, node| {
                        if v.is_ancestor_of(&version) {
                            hit = Some(node.clone());
                            false
                        } else {
                            true
                        }
                    });
                    if hit.is_some() {
                        found = hit;
                        false
                    } else {
                        true
                    }
                });
                found
            }
            Slot::Lightweight(node) => Some(node.clone()),
        }?;
        if found.is_orphan() {
            None
        } else {
            Some(found)
        }
    }
}

#[cfg(test)]
mod heap_test {
    use super::*;
    use crate::item::Item;
    use crate::node::Node;

    fn item(k: i64) -> Item<i64> {
        Item::new(Key::Int(k), k)
    }

    #[test]
    fn single_mode_sees_own_depth_and_ancestors() {
        let heap = HeapIndex::new(Mode::Single);
        let n1 = Node::new(Mode::Single, item(1));
        heap.update(Key::Int(1), 1, None, n1.clone());
        let n2 = Node::new(Mode::Single, item(10));
        heap.update(Key::Int(1), 2, None, n2.clone());

        let at_depth_1 = heap.lookup(&Key::Int(1), 1, None).unwrap();
        assert!(Rc::ptr_eq(&at_depth_1, &n1));
        let at_depth_2 = heap.lookup(&Key::Int(1), 2, None).unwrap();
        assert!(Rc::ptr_eq(&at_depth_2, &n2));
    }

    #[test]
    fn orphan_shadows_without_falling_through() {
        let heap = HeapIndex::new(Mode::Single);
        let n1 = Node::new(Mode::Single, item(1));
        heap.update(Key::Int(1), 1, None, n1);
        let tomb = Node::new_orphan(Mode::Single, item(1));
        heap.update(Key::Int(1), 2, None, tomb);

        assert!(heap.lookup(&Key::Int(1), 2, None).is_none());
    }

    #[test]
    fn multiway_branches_are_isolated() {
        let heap = HeapIndex::new(Mode::Multiway);
        let root = Version::root();
        let branch_a = root.child(0);
        let branch_b = root.child(1);

        let on_a = Node::new(Mode::Multiway, item(1));
        heap.update(Key::Int(1), 1, Some(&branch_a), on_a.clone());

        assert!(heap.lookup(&Key::Int(1), 1, Some(&branch_a)).is_some());
        assert!(heap.lookup(&Key::Int(1), 1, Some(&branch_b)).is_none());
    }
}
