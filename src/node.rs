//! §4.3 — node graph and neighbor resolution, and the `Version` identifier
//! multiway mode uses for ancestry testing.
//!
//! A [`Node`] is immutable except for its `orphan` flag (set once, at
//! tombstone creation) and its neighbor maps, which only ever gain new
//! `(depth, version)` entries — never rewritten or removed, per §5's
//! append-only shared-resource policy (lightweight mode is the one
//! exception: its neighbor cells are raw, overwritten references, because
//! by contract the predecessor map can no longer observe them).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::item::Item;
use crate::linked::LinkedOrderedMap;
use crate::map::Mode;

/// A path in the branching history of a multiway map. Per the REDESIGN
/// FLAGS note, this is a sequence of child indices rather than a
/// separator-joined string — prefix comparison is then just `starts_with`,
/// with no separator-collision hazard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version(Vec<u32>);

impl Version {
    pub fn root() -> Version {
        Version(Vec::new())
    }

    pub fn child(&self, nth: u32) -> Version {
        let mut path = self.0.clone();
        path.push(nth);
        Version(path)
    }

    /// `self` is an ancestor of (or equal to) `other`.
    pub fn is_ancestor_of(&self, other: &Version) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

pub type NodeRef<V> = Rc<Node<V>>;

/// One neighbor-pointer field (`previous` or `next`) of a [`Node`]. Which
/// variant is populated is decided once, by the map's `mode`, and never
/// changes for the lifetime of the node.
enum NeighborSlot<V> {
    Single(LinkedOrderedMap<usize, NodeRef<V>>),
    Multiway(LinkedOrderedMap<usize, LinkedOrderedMap<Version, NodeRef<V>>>),
    Lightweight(Option<NodeRef<V>>),
}

impl<V> NeighborSlot<V> {
    fn new(mode: Mode) -> NeighborSlot<V> {
        match mode {
            Mode::Single => NeighborSlot::Single(LinkedOrderedMap::new()),
            Mode::Multiway => NeighborSlot::Multiway(LinkedOrderedMap::new()),
            Mode::Lightweight => NeighborSlot::Lightweight(None),
        }
    }

    fn bind(&mut self, depth: usize, version: Option<&Version>, neighbor: NodeRef<V>) {
        match self {
            NeighborSlot::Single(layer) => layer.set(depth, neighbor, true),
            NeighborSlot::Multiway(layer) => {
                let version = version.cloned().unwrap_or_else(Version::root);
                match layer.get_mut(&depth) {
                    Some(stack) => stack.set(version, neighbor, true),
                    None => {
                        let mut stack = LinkedOrderedMap::new();
                        stack.set(version, neighbor, true);
                        layer.set(depth, stack, true);
                    }
                }
            }
            NeighborSlot::Lightweight(slot) => *slot = Some(neighbor),
        }
    }

    fn resolve(&self, depth: usize, version: Option<&Version>) -> Option<NodeRef<V>> {
        match self {
            NeighborSlot::Single(layer) => {
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
            NeighborSlot::Multiway(layer) => {
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
            NeighborSlot::Lightweight(slot) => slot.clone(),
        }
    }
}

/// A cell in the node graph. Shared by `Rc` across every map version that
/// can see it.
pub struct Node<V> {
    pub element: Item<V>,
    orphan: Cell<bool>,
    previous: RefCell<NeighborSlot<V>>,
    next: RefCell<NeighborSlot<V>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl<V> Node<V> {
    pub fn new(mode: Mode, element: Item<V>) -> NodeRef<V> {
        Rc::new(Node {
            element,
            orphan: Cell::new(false),
            previous: RefCell::new(NeighborSlot::new(mode)),
            next: RefCell::new(NeighborSlot::new(mode)),
        })
    }

    /// Construct a tombstone for a removed or superseded key. Carries no
    /// useful value; its only job is to shadow older entries for this key
    /// in the heap index (§4.2's "orphan" visibility rule, I5).
    pub fn new_orphan(mode: Mode, element: Item<V>) -> NodeRef<V> {
        let node = Node::new(mode, element);
        node.orphan.set(true);
        node
    }

    pub fn is_orphan(&self) -> bool {
        self.orphan.get()
    }

    /// Record `next` as this map's next-neighbor of `prev`, and `prev` as
    /// this map's previous-neighbor of `next`, tagged at `(depth, version)`.
    pub fn bind(
        depth: usize,
        version: Option<&Version>,
        prev: &NodeRef<V>,
        next: &NodeRef<V>,
    ) {
        prev.next.borrow_mut().bind(depth, version, next.clone());
        next.previous
            .borrow_mut()
            .bind(depth, version, prev.clone());
    }

    /// Resolve the neighbor of `from` in `direction`, as visible from a map
    /// at `(depth, version)`. Callers are responsible for the head/tail
    /// boundary check (`from_node is M.head going previous`, etc.) since
    /// that requires knowing the map's head/tail, which this function
    /// doesn't have.
    pub fn find_neighbor(
        from: &NodeRef<V>,
        direction: Direction,
        depth: usize,
        version: Option<&Version>,
    ) -> Option<NodeRef<V>> {
        let slot = match direction {
            Direction::Previous => &from.previous,
            Direction::Next => &from.next,
        };
        slot.borrow().resolve(depth, version)
    }
}

#[cfg(test)]
mod node_test {
    use super::*;
    use crate::item::Key;

    fn item(k: i64) -> Item<i64> {
        Item::new(Key::Int(k), k)
    }

    #[test]
    fn single_mode_sees_only_depth_at_or_below_self() {
        let a = Node::new(Mode::Single, item(1));
        let b = Node::new(Mode::Single, item(2));
        let c = Node::new(Mode::Single, item(3));

        Node::bind(1, None, &a, &b);
        Node::bind(2, None, &b, &c);

        // At depth 1, c is not yet visible as b's next.
        assert!(Node::find_neighbor(&b, Direction::Next, 1, None).is_none());
        // At depth 2, it is.
        let next = Node::find_neighbor(&b, Direction::Next, 2, None).unwrap();
        assert!(Rc::ptr_eq(&next, &c));
    }

    #[test]
    fn multiway_mode_respects_version_ancestry() {
        let a = Node::new(Mode::Multiway, item(1));
        let b_on_branch = Node::new(Mode::Multiway, item(2));
        let branch = Version::root().child(0);
        let other_branch = Version::root().child(1);

        Node::bind(1, Some(&branch), &a, &b_on_branch);

        assert!(Node::find_neighbor(&a, Direction::Next, 1, Some(&branch)).is_some());
        assert!(Node::find_neighbor(&a, Direction::Next, 1, Some(&other_branch)).is_none());
    }

    #[test]
    fn lightweight_mode_overwrites_raw_pointer() {
        let a = Node::new(Mode::Lightweight, item(1));
        let b = Node::new(Mode::Lightweight, item(2));
        let c = Node::new(Mode::Lightweight, item(3));

        Node::bind(0, None, &a, &b);
        Node::bind(0, None, &a, &c);

        let next = Node::find_neighbor(&a, Direction::Next, 0, None).unwrap();
        assert!(Rc::ptr_eq(&next, &c));
    }
}
