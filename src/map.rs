//! §4.4 — the map façade and mutation engine: the user-visible persistent
//! map, fork-on-write, change recording and mode-specific gating.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::change::Change;
use crate::error::{Error, Result};
use crate::heap::{HeapIndex, SharedHeap};
use crate::item::{values_identity_equal, Item, Key};
use crate::node::{Direction, Node, NodeRef, Version};

/// How a map resolves "which node belongs to me?" during lookup. See
/// spec.md §1 for the trade-offs between the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// At most one mutation per map; one linear branch of history.
    Single = 1,
    /// Arbitrary branching of history.
    Multiway = 2,
    /// At most one mutation, after which the predecessor becomes unusable.
    Lightweight = 3,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Multiway
    }
}

impl From<u8> for Mode {
    /// Unknown mode codes silently fall back to the default, per §6.
    fn from(n: u8) -> Mode {
        match n {
            1 => Mode::Single,
            3 => Mode::Lightweight,
            2 => Mode::Multiway,
            _ => Mode::default(),
        }
    }
}

/// Configuration accepted by the map factory, mirroring §6's
/// `new Map({initialItems, keyPropName, mode, lazy})`.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub key_prop_name: String,
    pub mode: Mode,
    pub lazy: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            key_prop_name: "id".to_string(),
            mode: Mode::default(),
            lazy: false,
        }
    }
}

/// The persistent, insertion-ordered map. One value of this type is one
/// logical version; mutating it produces a sibling `OrderedMap`, never
/// touching `self`, except for the mode gate flag (§4.4's "Mode gates").
pub struct OrderedMap<V> {
    heap: SharedHeap<V>,
    depth: usize,
    version: Version,
    head: Option<NodeRef<V>>,
    tail: Option<NodeRef<V>>,
    length: usize,
    key_prop_name: Rc<str>,
    mode: Mode,
    ancestor: Option<Rc<OrderedMap<V>>>,
    change: Option<Change<V>>,
    mutated: Cell<bool>,
    child_count: Cell<u32>,
}

impl<V> Clone for OrderedMap<V> {
    fn clone(&self) -> Self {
        OrderedMap {
            heap: self.heap.clone(),
            depth: self.depth,
            version: self.version.clone(),
            head: self.head.clone(),
            tail: self.tail.clone(),
            length: self.length,
            key_prop_name: self.key_prop_name.clone(),
            mode: self.mode,
            ancestor: self.ancestor.clone(),
            change: self.change.clone(),
            mutated: Cell::new(self.mutated.get()),
            child_count: Cell::new(self.child_count.get()),
        }
    }
}

impl<V> OrderedMap<V> {
    /// Build the empty root of a new lineage and populate it with
    /// `initial_items`, in index order (first index wins on duplicate
    /// keys, per `set`'s contract).
    pub fn new_root(config: MapConfig, initial_items: Vec<Item<V>>) -> OrderedMap<V>
    where
        V: PartialEq,
    {
        let root = OrderedMap {
            heap: HeapIndex::new(config.mode),
            depth: 0,
            version: Version::root(),
            head: None,
            tail: None,
            length: 0,
            key_prop_name: Rc::from(config.key_prop_name.as_str()),
            mode: config.mode,
            ancestor: None,
            change: None,
            mutated: Cell::new(false),
            child_count: Cell::new(0),
        };
        if initial_items.is_empty() {
            root
        } else {
            // Initial population never hits a gate: the root is fresh.
            root.set(initial_items, false).unwrap()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn key_prop_name(&self) -> &str {
        &self.key_prop_name
    }

    pub fn ancestor(&self) -> Option<&OrderedMap<V>> {
        self.ancestor.as_deref()
    }

    pub fn change(&self) -> Option<&Change<V>> {
        self.change.as_ref()
    }

    pub fn len(&self) -> Result<usize> {
        self.check_gate("len", false)?;
        Ok(self.length)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.check_gate("isEmpty", false)?;
        Ok(self.length == 0)
    }

    /// The source's `Map.isMap(v)` probe. Rust's type system already makes
    /// this statically true; this inherent method mirrors the runtime
    /// check so a caller translating JS-shaped code has somewhere to call.
    pub fn is_map(&self) -> bool {
        true
    }

    fn check_gate(&self, op: &'static str, is_mutation: bool) -> Result<()> {
        if self.mode == Mode::Lightweight && self.mutated.get() {
            return Err(Error::LightweightModePostMutationUse(op));
        }
        if is_mutation && self.mode == Mode::Single && self.mutated.get() {
            return Err(Error::SingleModeMutationAlreadyOccurred(op));
        }
        Ok(())
    }

    fn version_for_lookup(&self) -> Option<&Version> {
        match self.mode {
            Mode::Multiway => Some(&self.version),
            _ => None,
        }
    }

    /// Depth and version a *child* forked from `self` would write at/see.
    /// Computed once per mutation call and used for every heap read and
    /// write during that call — see map.rs module docs in DESIGN.md for why
    /// this collapses the spec's "lookup on `this` vs on the fork" into one
    /// coordinate.
    fn fork_coords(&self) -> (usize, Version) {
        let depth = self.depth + 1;
        let version = match self.mode {
            Mode::Multiway => {
                let nth = self.child_count.get();
                self.child_count.set(nth + 1);
                self.version.child(nth)
            }
            _ => self.version.clone(),
        };
        (depth, version)
    }

    fn lookup_node(&self, key: &Key, depth: usize, version: &Version) -> Option<NodeRef<V>> {
        let version = match self.mode {
            Mode::Multiway => Some(version),
            _ => None,
        };
        self.heap.lookup(key, depth, version)
    }

    pub fn get(&self, key: &Key) -> Result<Option<Rc<V>>> {
        self.check_gate("get", false)?;
        Ok(self
            .heap
            .lookup(key, self.depth, self.version_for_lookup())
            .map(|node| node.element.value.clone()))
    }

    pub fn first(&self) -> Result<Option<Item<V>>> {
        self.check_gate("first", false)?;
        Ok(self.head.as_ref().map(|n| n.element.clone()))
    }

    pub fn last(&self) -> Result<Option<Item<V>>> {
        self.check_gate("last", false)?;
        Ok(self.tail.as_ref().map(|n| n.element.clone()))
    }

    fn neighbor(&self, node: &NodeRef<V>, direction: Direction) -> Option<NodeRef<V>> {
        let boundary = match direction {
            Direction::Previous => self.head.as_ref(),
            Direction::Next => self.tail.as_ref(),
        };
        if boundary.map(|b| Rc::ptr_eq(b, node)).unwrap_or(false) {
            return None;
        }
        Node::find_neighbor(node, direction, self.depth, self.version_for_lookup())
    }

    /// Walk the map from `head` (or `tail` if `reversed`), calling
    /// `f(index, &item)` for each live entry. Returning `false` aborts the
    /// walk, matching `forEach`'s early-exit contract.
    pub fn for_each<F>(&self, reversed: bool, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &Item<V>) -> bool,
    {
        self.check_gate("forEach", false)?;
        let (mut cur, direction) = if reversed {
            (self.tail.clone(), Direction::Previous)
        } else {
            (self.head.clone(), Direction::Next)
        };
        let mut index = 0;
        while let Some(node) = cur {
            if !f(index, &node.element) {
                break;
            }
            index += 1;
            cur = self.neighbor(&node, direction);
        }
        Ok(())
    }

    /// Items from `head` through `key` (or mirrored from `tail` for
    /// `range_after`), truncated to `max` and always returned in forward
    /// order. Empty if `key` is absent or `max == 0`.
    pub fn range_before(&self, key: &Key, max: usize, inclusive: bool) -> Result<Vec<Item<V>>> {
        self.check_gate("rangeBefore", false)?;
        self.range(key, max, inclusive, Direction::Previous)
    }

    pub fn range_after(&self, key: &Key, max: usize, inclusive: bool) -> Result<Vec<Item<V>>> {
        self.check_gate("rangeAfter", false)?;
        self.range(key, max, inclusive, Direction::Next)
    }

    fn range(
        &self,
        key: &Key,
        max: usize,
        inclusive: bool,
        direction: Direction,
    ) -> Result<Vec<Item<V>>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let start = match self
            .heap
            .lookup(key, self.depth, self.version_for_lookup())
        {
            Some(node) => node,
            None => return Ok(Vec::new()),
        };
        let mut collected = Vec::new();
        if inclusive {
            collected.push(start.element.clone());
        }
        let mut cur = self.neighbor(&start, direction);
        while let Some(node) = cur {
            if collected.len() >= max {
                break;
            }
            collected.push(node.element.clone());
            cur = self.neighbor(&node, direction);
        }
        collected.truncate(max);
        if direction == Direction::Previous {
            collected.reverse();
        }
        Ok(collected)
    }

    /// Rebind `old_node`'s neighbors around a replacement (`Some`) or
    /// around nothing at all (`None`, a removal), returning the possibly
    /// updated `(head, tail)` for the map under construction. One routine
    /// covers `set`'s in-place value update, `unset`'s removal, and
    /// `replace`'s rename-in-place / collision-drop cases.
    #[allow(clippy::too_many_arguments)]
    fn splice(
        &self,
        depth: usize,
        version: &Version,
        cur_head: &mut Option<NodeRef<V>>,
        cur_tail: &mut Option<NodeRef<V>>,
        old_node: &NodeRef<V>,
        replacement: Option<NodeRef<V>>,
    ) {
        let version_opt = match self.mode {
            Mode::Multiway => Some(version),
            _ => None,
        };
        let prev = if cur_head.as_ref().map(|h| Rc::ptr_eq(h, old_node)).unwrap_or(false) {
            None
        } else {
            Node::find_neighbor(old_node, Direction::Previous, depth, version_opt)
        };
        let next = if cur_tail.as_ref().map(|t| Rc::ptr_eq(t, old_node)).unwrap_or(false) {
            None
        } else {
            Node::find_neighbor(old_node, Direction::Next, depth, version_opt)
        };

        match replacement {
            Some(new_node) => {
                match &prev {
                    Some(p) => Node::bind(depth, version_opt, p, &new_node),
                    None => *cur_head = Some(new_node.clone()),
                }
                match &next {
                    Some(n) => Node::bind(depth, version_opt, &new_node, n),
                    None => *cur_tail = Some(new_node.clone()),
                }
            }
            None => match (&prev, &next) {
                (Some(p), Some(n)) => Node::bind(depth, version_opt, p, n),
                (Some(_), None) => *cur_tail = prev,
                (None, Some(_)) => *cur_head = next,
                (None, None) => {
                    *cur_head = None;
                    *cur_tail = None;
                }
            },
        }
    }

    /// Attach a freshly built chain of brand-new nodes either after the
    /// current tail (append, the default) or before the current head
    /// (`prepend_missing`).
    fn attach_chain(
        &self,
        depth: usize,
        version: &Version,
        cur_head: &mut Option<NodeRef<V>>,
        cur_tail: &mut Option<NodeRef<V>>,
        chain_head: NodeRef<V>,
        chain_tail: NodeRef<V>,
        prepend_missing: bool,
    ) {
        let version_opt = match self.mode {
            Mode::Multiway => Some(version),
            _ => None,
        };
        if prepend_missing {
            if let Some(old_head) = cur_head.clone() {
                Node::bind(depth, version_opt, &chain_tail, &old_head);
            }
            if cur_tail.is_none() {
                *cur_tail = Some(chain_tail);
            }
            *cur_head = Some(chain_head);
        } else {
            if let Some(old_tail) = cur_tail.clone() {
                Node::bind(depth, version_opt, &old_tail, &chain_head);
            }
            if cur_head.is_none() {
                *cur_head = Some(chain_head);
            }
            *cur_tail = Some(chain_tail);
        }
    }

    fn fork(
        &self,
        depth: usize,
        version: Version,
        head: Option<NodeRef<V>>,
        tail: Option<NodeRef<V>>,
        length: usize,
        change: Change<V>,
    ) -> OrderedMap<V> {
        self.mutated.set(true);
        OrderedMap {
            heap: self.heap.clone(),
            depth,
            version,
            head,
            tail,
            length,
            key_prop_name: self.key_prop_name.clone(),
            mode: self.mode,
            ancestor: Some(Rc::new(self.clone())),
            change: Some(change),
            mutated: Cell::new(false),
            child_count: Cell::new(0),
        }
    }

    /// §4.4 `set`: insert or update every item in `items`. For duplicate
    /// keys within the batch the first (lowest index) occurrence wins;
    /// later duplicates are dropped up front so the chain-building pass
    /// below never has to reconcile two brand-new nodes for the same key.
    pub fn set(&self, items: Vec<Item<V>>, prepend_missing: bool) -> Result<OrderedMap<V>>
    where
        V: PartialEq,
    {
        self.check_gate("set", true)?;
        if items.is_empty() {
            return Ok(self.clone());
        }

        let mut seen = HashSet::with_capacity(items.len());
        let items: Vec<Item<V>> = items
            .into_iter()
            .filter(|item| seen.insert(item.key.clone()))
            .collect();

        let (depth, version) = self.fork_coords();
        let mut cur_head = self.head.clone();
        let mut cur_tail = self.tail.clone();
        let mut new_chain_head: Option<NodeRef<V>> = None;
        let mut new_chain_tail: Option<NodeRef<V>> = None;
        let mut inserted_keys = HashSet::new();
        let mut updated_keys = HashSet::new();

        for idx in (0..items.len()).rev() {
            let item = &items[idx];
            let existing = self.lookup_node(&item.key, depth, &version);
            match existing {
                Some(node) if values_identity_equal(&node.element.value, &item.value) => {
                    continue;
                }
                Some(node) => {
                    let new_node = Node::new(self.mode, item.clone());
                    self.heap
                        .update(item.key.clone(), depth, Some(&version), new_node.clone());
                    self.splice(depth, &version, &mut cur_head, &mut cur_tail, &node, Some(new_node));
                    updated_keys.insert(item.key.clone());
                }
                None => {
                    let new_node = Node::new(self.mode, item.clone());
                    self.heap
                        .update(item.key.clone(), depth, Some(&version), new_node.clone());
                    match new_chain_head.take() {
                        Some(existing_chain_head) => {
                            Node::bind(
                                depth,
                                match self.mode {
                                    Mode::Multiway => Some(&version),
                                    _ => None,
                                },
                                &new_node,
                                &existing_chain_head,
                            );
                            new_chain_head = Some(new_node);
                        }
                        None => {
                            new_chain_head = Some(new_node.clone());
                            new_chain_tail = Some(new_node);
                        }
                    }
                    inserted_keys.insert(item.key.clone());
                }
            }
        }

        if inserted_keys.is_empty() && updated_keys.is_empty() {
            return Ok(self.clone());
        }

        if let (Some(chain_head), Some(chain_tail)) = (new_chain_head, new_chain_tail) {
            self.attach_chain(
                depth,
                &version,
                &mut cur_head,
                &mut cur_tail,
                chain_head,
                chain_tail,
                prepend_missing,
            );
        }

        // §4.4: "both lists are ordered by final position in the new map" —
        // walk the spliced chain rather than trust argument order, since an
        // in-place update keeps its original, possibly scattered, position.
        let mut inserted = Vec::with_capacity(inserted_keys.len());
        let mut updated = Vec::with_capacity(updated_keys.len());
        for key in self.final_order(depth, &version, &cur_head, &cur_tail) {
            if inserted_keys.contains(&key) {
                inserted.push(key);
            } else if updated_keys.contains(&key) {
                updated.push(key);
            }
        }

        let length = self.length + inserted.len();
        Ok(self.fork(
            depth,
            version,
            cur_head,
            cur_tail,
            length,
            Change::Set {
                inserted,
                updated,
                prepend_missing,
            },
        ))
    }

    /// Walk a chain under construction, from `head` through `tail`, at
    /// `(depth, version)`. Used to recover final-map ordering for change
    /// records once splicing is done but before the map itself exists.
    fn final_order(
        &self,
        depth: usize,
        version: &Version,
        head: &Option<NodeRef<V>>,
        tail: &Option<NodeRef<V>>,
    ) -> Vec<Key> {
        let version_opt = match self.mode {
            Mode::Multiway => Some(version),
            _ => None,
        };
        let mut out = Vec::new();
        let mut cur = head.clone();
        while let Some(node) = cur {
            out.push(node.element.key.clone());
            if tail.as_ref().map(|t| Rc::ptr_eq(t, &node)).unwrap_or(false) {
                break;
            }
            cur = Node::find_neighbor(&node, Direction::Next, depth, version_opt);
        }
        out
    }

    /// §4.4 `replace`.
    pub fn replace(
        &self,
        old_key: &Key,
        item: Item<V>,
        add_missing: bool,
        prepend_missing: bool,
    ) -> Result<OrderedMap<V>>
    where
        V: PartialEq,
    {
        self.check_gate("replace", true)?;
        let (depth, version) = self.fork_coords();

        let old_node = self.lookup_node(old_key, depth, &version);

        let old_node = match old_node {
            None => {
                if !add_missing {
                    return Ok(self.clone());
                }
                return self.replace_add_missing(depth, version, item, prepend_missing);
            }
            Some(node) => node,
        };

        if item.key == *old_key && values_identity_equal(&old_node.element.value, &item.value) {
            return Ok(self.clone());
        }

        let mut cur_head = self.head.clone();
        let mut cur_tail = self.tail.clone();

        if item.key == *old_key {
            // value-only change, no tombstone needed.
            let new_node = Node::new(self.mode, item.clone());
            self.heap
                .update(item.key.clone(), depth, Some(&version), new_node.clone());
            self.splice(
                depth,
                &version,
                &mut cur_head,
                &mut cur_tail,
                &old_node,
                Some(new_node),
            );
            return Ok(self.fork(
                depth,
                version,
                cur_head,
                cur_tail,
                self.length,
                Change::Replace {
                    old_key: old_key.clone(),
                    key: item.key.clone(),
                    value: item.value.clone(),
                    was_inserted: false,
                    was_updated: true,
                    had_existent_node_for_key: true,
                    prepend_missing,
                },
            ));
        }

        let existing_for_new_key = self.lookup_node(&item.key, depth, &version);
        let new_key_already_occupied = existing_for_new_key.is_some();
        let orphan = Node::new_orphan(self.mode, old_node.element.clone());
        self.heap
            .update(old_key.clone(), depth, Some(&version), orphan);

        let length = if new_key_already_occupied {
            // New key already lives elsewhere: drop old_key's slot,
            // leave the existing node's position untouched.
            self.splice(depth, &version, &mut cur_head, &mut cur_tail, &old_node, None);
            self.length - 1
        } else {
            let new_node = Node::new(self.mode, item.clone());
            self.heap
                .update(item.key.clone(), depth, Some(&version), new_node.clone());
            self.splice(
                depth,
                &version,
                &mut cur_head,
                &mut cur_tail,
                &old_node,
                Some(new_node),
            );
            self.length
        };

        Ok(self.fork(
            depth,
            version,
            cur_head,
            cur_tail,
            length,
            Change::Replace {
                old_key: old_key.clone(),
                key: item.key.clone(),
                value: item.value.clone(),
                was_inserted: !new_key_already_occupied,
                was_updated: new_key_already_occupied,
                had_existent_node_for_key: true,
                prepend_missing,
            },
        ))
    }

    fn replace_add_missing(
        &self,
        depth: usize,
        version: Version,
        item: Item<V>,
        prepend_missing: bool,
    ) -> Result<OrderedMap<V>>
    where
        V: PartialEq,
    {
        let existing = self.lookup_node(&item.key, depth, &version);
        let mut cur_head = self.head.clone();
        let mut cur_tail = self.tail.clone();

        match existing {
            Some(node) if values_identity_equal(&node.element.value, &item.value) => Ok(self.clone()),
            Some(node) => {
                let new_node = Node::new(self.mode, item.clone());
                self.heap
                    .update(item.key.clone(), depth, Some(&version), new_node.clone());
                self.splice(
                    depth,
                    &version,
                    &mut cur_head,
                    &mut cur_tail,
                    &node,
                    Some(new_node),
                );
                Ok(self.fork(
                    depth,
                    version,
                    cur_head,
                    cur_tail,
                    self.length,
                    Change::Replace {
                        old_key: item.key.clone(),
                        key: item.key.clone(),
                        value: item.value.clone(),
                        was_inserted: false,
                        was_updated: true,
                        had_existent_node_for_key: false,
                        prepend_missing,
                    },
                ))
            }
            None => {
                let new_node = Node::new(self.mode, item.clone());
                self.heap
                    .update(item.key.clone(), depth, Some(&version), new_node.clone());
                self.attach_chain(
                    depth,
                    &version,
                    &mut cur_head,
                    &mut cur_tail,
                    new_node.clone(),
                    new_node,
                    prepend_missing,
                );
                Ok(self.fork(
                    depth,
                    version,
                    cur_head,
                    cur_tail,
                    self.length + 1,
                    Change::Replace {
                        old_key: item.key.clone(),
                        key: item.key.clone(),
                        value: item.value.clone(),
                        was_inserted: true,
                        was_updated: false,
                        had_existent_node_for_key: false,
                        prepend_missing,
                    },
                ))
            }
        }
    }

    /// §4.4 `unset` on a single key.
    pub fn unset_key(&self, key: &Key) -> Result<OrderedMap<V>> {
        self.check_gate("unset", true)?;
        let (depth, version) = self.fork_coords();
        let node = match self.lookup_node(key, depth, &version) {
            Some(node) => node,
            None => return Ok(self.clone()),
        };

        let mut cur_head = self.head.clone();
        let mut cur_tail = self.tail.clone();
        self.splice(depth, &version, &mut cur_head, &mut cur_tail, &node, None);
        let orphan = Node::new_orphan(self.mode, node.element.clone());
        self.heap.update(key.clone(), depth, Some(&version), orphan);

        Ok(self.fork(
            depth,
            version,
            cur_head,
            cur_tail,
            self.length - 1,
            Change::Unset {
                key: key.clone(),
                value: node.element.value.clone(),
            },
        ))
    }

    /// §4.4 `unset` over a sequence of keys, folded left to right.
    pub fn unset_keys(&self, keys: &[Key]) -> Result<OrderedMap<V>> {
        let mut cur = self.clone();
        for key in keys {
            cur = cur.unset_key(key)?;
        }
        Ok(cur)
    }

    /// §4.4 `empty`.
    pub fn empty(&self) -> Result<OrderedMap<V>> {
        self.check_gate("empty", true)?;
        if self.length == 0 {
            return Ok(self.clone());
        }
        self.mutated.set(true);
        Ok(OrderedMap {
            heap: HeapIndex::new(self.mode),
            depth: self.depth + 1,
            version: Version::root(),
            head: None,
            tail: None,
            length: 0,
            key_prop_name: self.key_prop_name.clone(),
            mode: self.mode,
            ancestor: Some(Rc::new(self.clone())),
            change: Some(Change::Empty),
            mutated: Cell::new(false),
            child_count: Cell::new(0),
        })
    }
}

#[cfg(test)]
mod map_test {
    use super::*;

    fn key(k: i64) -> Key {
        Key::Int(k)
    }

    fn item(k: i64, v: &str) -> Item<String> {
        Item::new(key(k), v.to_string())
    }

    fn keys_of(m: &OrderedMap<String>) -> Vec<i64> {
        let mut out = Vec::new();
        m.for_each(false, |_, it| {
            out.push(it.key.as_int().unwrap());
            true
        })
        .unwrap();
        out
    }

    #[test]
    fn single_mode_append_and_reuse_error() {
        let m = OrderedMap::new_root(
            MapConfig {
                mode: Mode::Single,
                ..Default::default()
            },
            vec![item(1, "a"), item(2, "b")],
        );
        assert_eq!(keys_of(&m), vec![1, 2]);

        let m2 = m.set(vec![item(3, "c")], false).unwrap();
        assert_eq!(keys_of(&m2), vec![1, 2, 3]);

        let err = m.set(vec![item(4, "d")], false).unwrap_err();
        assert_eq!(err, Error::SingleModeMutationAlreadyOccurred("set"));
        // Reads on the mutated single-mode map still work.
        assert_eq!(keys_of(&m), vec![1, 2]);
    }

    #[test]
    fn prepend_vs_append() {
        let m = OrderedMap::new_root(MapConfig::default(), vec![item(1, "a"), item(2, "b")]);
        let prepended = m.set(vec![item(0, "z")], true).unwrap();
        assert_eq!(keys_of(&prepended), vec![0, 1, 2]);
        let appended = m.set(vec![item(3, "c")], false).unwrap();
        assert_eq!(keys_of(&appended), vec![1, 2, 3]);
    }

    #[test]
    fn multiway_branches_do_not_see_each_other() {
        let m = OrderedMap::new_root(
            MapConfig {
                mode: Mode::Multiway,
                ..Default::default()
            },
            vec![],
        );
        let a = m.set(vec![item(1, "a")], false).unwrap();
        let b = m.set(vec![item(2, "b")], false).unwrap();
        assert!(a.get(&key(2)).unwrap().is_none());
        assert!(b.get(&key(1)).unwrap().is_none());

        let c = a.set(vec![item(2, "b2")], false).unwrap();
        assert_eq!(keys_of(&c), vec![1, 2]);
        assert_eq!(*c.get(&key(2)).unwrap().unwrap(), "b2");
    }

    #[test]
    fn unset_repairs_head_and_tail() {
        let m = OrderedMap::new_root(
            MapConfig::default(),
            vec![item(1, "a"), item(2, "b"), item(3, "c")],
        );
        let m2 = m.unset_key(&key(2)).unwrap();
        assert_eq!(keys_of(&m2), vec![1, 3]);
        assert_eq!(m2.first().unwrap().unwrap().key, key(1));
        assert_eq!(m2.last().unwrap().unwrap().key, key(3));

        let dropped_head = m.unset_key(&key(1)).unwrap();
        assert_eq!(dropped_head.first().unwrap().unwrap().key, key(2));
        let dropped_tail = m.unset_key(&key(3)).unwrap();
        assert_eq!(dropped_tail.last().unwrap().unwrap().key, key(2));
    }

    #[test]
    fn replace_with_key_change() {
        let m = OrderedMap::new_root(MapConfig::default(), vec![item(1, "a"), item(2, "b")]);
        let m2 = m.replace(&key(1), item(9, "x"), false, false).unwrap();
        assert_eq!(keys_of(&m2), vec![9, 2]);
        assert!(m2.get(&key(1)).unwrap().is_none());
        assert_eq!(*m2.get(&key(9)).unwrap().unwrap(), "x");
    }

    #[test]
    fn lightweight_lockout() {
        let m = OrderedMap::new_root(
            MapConfig {
                mode: Mode::Lightweight,
                ..Default::default()
            },
            vec![item(1, "a")],
        );
        let m2 = m.set(vec![item(2, "b")], false).unwrap();
        let err = m.get(&key(1)).unwrap_err();
        assert_eq!(err, Error::LightweightModePostMutationUse("get"));
        assert_eq!(*m2.get(&key(1)).unwrap().unwrap(), "a");
    }

    #[test]
    fn range_before_and_after() {
        let m = OrderedMap::new_root(
            MapConfig::default(),
            (1..=5).map(|i| item(i, "v")).collect(),
        );
        let before = m.range_before(&key(4), 2, true).unwrap();
        assert_eq!(
            before.iter().map(|it| it.key.as_int().unwrap()).collect::<Vec<_>>(),
            vec![3, 4]
        );
        let after = m.range_after(&key(2), 2, false).unwrap();
        assert_eq!(
            after.iter().map(|it| it.key.as_int().unwrap()).collect::<Vec<_>>(),
            vec![3, 4]
        );
    }

    #[test]
    fn set_noop_on_identity_equal_value() {
        let m = OrderedMap::new_root(MapConfig::default(), vec![item(1, "a")]);
        let existing = m.get(&key(1)).unwrap().unwrap();
        let same = Item::from_rc(key(1), existing);
        let m2 = m.set(vec![same], false).unwrap();
        assert_eq!(m2.len().unwrap(), m.len().unwrap());
        assert!(m2.change().is_none());
    }

    #[test]
    fn empty_on_nonempty_and_noop_on_empty() {
        let m = OrderedMap::new_root(MapConfig::default(), vec![item(1, "a")]);
        let e = m.empty().unwrap();
        assert_eq!(e.len().unwrap(), 0);
        let e2 = e.empty().unwrap();
        assert_eq!(e2.len().unwrap(), 0);
        assert!(e2.change().is_none());
    }
}
