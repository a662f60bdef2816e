//! Outgoing edges of a shape node.
//!
//! Almost every node has zero or one child, so the table starts out empty,
//! stores its first edge inline, and only moves to a hash map once a second
//! distinct key arrives. Children are held weakly: an edge whose child has
//! been collected behaves exactly like a missing edge.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::gc::{Gc, WeakGc};
use crate::property::PropertyFlags;
use crate::shape::ShapeNode;
use crate::symbol::SymbolId;

/// Label of an edge in the shape tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub symbol: SymbolId,
    pub flags: PropertyFlags,
}

impl Transition {
    pub fn new(symbol: SymbolId, flags: PropertyFlags) -> Self {
        Self { symbol, flags }
    }

    /// Edge for changing the flags of an existing property to `new_flags`.
    pub fn flags_update(symbol: SymbolId, new_flags: PropertyFlags) -> Self {
        Self {
            symbol,
            flags: new_flags | PropertyFlags::FLAGS_TRANSITION,
        }
    }

    pub fn is_flags_update(&self) -> bool {
        self.flags.contains(PropertyFlags::FLAGS_TRANSITION)
    }
}

type OverflowMap = HashMap<Transition, WeakGc<ShapeNode>, FxBuildHasher>;

#[derive(Debug, Default)]
pub enum TransitionTable {
    /// Nothing was ever inserted.
    #[default]
    Empty,
    /// Exactly one key; the child may have died since.
    Single {
        key: Transition,
        child: WeakGc<ShapeNode>,
    },
    /// Two or more distinct keys were inserted at some point.
    Overflow(Box<OverflowMap>),
}

impl TransitionTable {
    /// Live child for `key`, if any.
    pub fn lookup(&self, key: &Transition) -> Option<Gc<ShapeNode>> {
        match self {
            TransitionTable::Empty => None,
            TransitionTable::Single { key: k, child } if k == key => child.upgrade(),
            TransitionTable::Single { .. } => None,
            TransitionTable::Overflow(map) => map.get(key).and_then(WeakGc::upgrade),
        }
    }

    pub fn contains_key(&self, key: &Transition) -> bool {
        match self {
            TransitionTable::Empty => false,
            TransitionTable::Single { key: k, child } => k == key && child.is_live(),
            TransitionTable::Overflow(map) => map.get(key).is_some_and(WeakGc::is_live),
        }
    }

    /// Insert an edge. Returns false, leaving the table untouched, if `key`
    /// already leads to a live child.
    pub fn insert_new(&mut self, key: Transition, child: &Gc<ShapeNode>) -> bool {
        if self.contains_key(&key) {
            return false;
        }
        let weak = child.downgrade();
        match self {
            TransitionTable::Empty => {
                *self = TransitionTable::Single { key, child: weak };
            }
            TransitionTable::Single { key: k, child: c } if *k == key => {
                // Same key, dead child: reuse the inline slot.
                *c = weak;
            }
            TransitionTable::Single { .. } => {
                let mut map = OverflowMap::with_capacity_and_hasher(2, FxBuildHasher);
                if let TransitionTable::Single { key: k, child: c } = std::mem::take(self) {
                    if c.is_live() {
                        map.insert(k, c);
                    }
                }
                map.insert(key, weak);
                *self = TransitionTable::Overflow(Box::new(map));
            }
            TransitionTable::Overflow(map) => {
                map.insert(key, weak);
            }
        }
        true
    }

    /// True only if nothing was ever inserted. May report false for a table
    /// whose children have all died.
    pub fn is_known_empty(&self) -> bool {
        matches!(self, TransitionTable::Empty)
    }

    /// Hand every weak slot to the collector, then drop overflow entries it
    /// cleared.
    pub fn mark_weak_refs<F: FnMut(&mut WeakGc<ShapeNode>)>(&mut self, mut visitor: F) {
        match self {
            TransitionTable::Empty => {}
            TransitionTable::Single { child, .. } => visitor(child),
            TransitionTable::Overflow(map) => {
                for child in map.values_mut() {
                    visitor(child);
                }
                map.retain(|_, child| !child.is_cleared());
            }
        }
    }

    /// Live edges, in no particular order.
    pub fn live_children(&self) -> Vec<(Transition, Gc<ShapeNode>)> {
        match self {
            TransitionTable::Empty => Vec::new(),
            TransitionTable::Single { key, child } => {
                child.upgrade().map(|c| (*key, c)).into_iter().collect()
            }
            TransitionTable::Overflow(map) => map
                .iter()
                .filter_map(|(key, child)| child.upgrade().map(|c| (*key, c)))
                .collect(),
        }
    }

    /// Number of edges whose child is still alive.
    pub fn live_len(&self) -> usize {
        match self {
            TransitionTable::Empty => 0,
            TransitionTable::Single { child, .. } => usize::from(child.is_live()),
            TransitionTable::Overflow(map) => map.values().filter(|c| c.is_live()).count(),
        }
    }

    /// Out-of-line bytes. The inline entry counts as part of the node.
    pub fn memory_size(&self) -> usize {
        match self {
            TransitionTable::Overflow(map) => {
                std::mem::size_of::<OverflowMap>()
                    + map.capacity()
                        * (std::mem::size_of::<Transition>()
                            + std::mem::size_of::<WeakGc<ShapeNode>>())
            }
            _ => 0,
        }
    }
}
