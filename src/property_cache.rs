//! Single-entry property lookup cache, as kept by a property access site.

use crate::gc::WeakGc;
use crate::property::SlotIndex;
use crate::shape::{Shape, ShapeNode};

/// Remembers the slot a property lived in for one shape.
#[derive(Debug, Clone, Default)]
pub struct PropertyCacheEntry {
    shape: WeakGc<ShapeNode>,
    slot: SlotIndex,
}

impl PropertyCacheEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache `slot` for `shape`. Refused for no-cache dictionaries, whose
    /// layout can change without their identity changing.
    pub fn try_populate(&mut self, shape: &Shape, slot: SlotIndex) -> bool {
        if shape.borrow().is_dictionary_no_cache() {
            return false;
        }
        self.shape = shape.downgrade();
        self.slot = slot;
        true
    }

    /// Slot for `shape` if it is the shape this entry was populated with.
    pub fn lookup(&self, shape: &Shape) -> Option<SlotIndex> {
        (self.shape.is_live() && self.shape.refers_to(shape)).then_some(self.slot)
    }

    pub fn clear(&mut self) {
        self.shape.clear();
        self.slot = 0;
    }

    pub fn is_empty(&self) -> bool {
        !self.shape.is_live()
    }

    pub fn mark_weak_refs<F: FnMut(&mut WeakGc<ShapeNode>)>(&mut self, mut visitor: F) {
        visitor(&mut self.shape);
    }
}
