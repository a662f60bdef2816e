//! Flattened name -> descriptor table.
//!
//! Built lazily from a shape's transition chain, or owned outright by a
//! dictionary-mode shape. Entries keep insertion order, which is also the
//! enumeration order.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::property::{NamedPropertyDescriptor, PropertyPos, SlotIndex};
use crate::symbol::SymbolId;

#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: IndexMap<SymbolId, NamedPropertyDescriptor, FxBuildHasher>,
    /// Slots freed by deletions, reused most-recent first.
    deleted_slots: Vec<SlotIndex>,
    /// Lowest slot number never handed out.
    next_slot: SlotIndex,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            deleted_slots: Vec::new(),
            next_slot: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: SymbolId) -> Option<PropertyPos> {
        self.entries.get_index_of(&name).map(PropertyPos)
    }

    pub fn get(&self, name: SymbolId) -> Option<NamedPropertyDescriptor> {
        self.entries.get(&name).copied()
    }

    pub fn descriptor_at(&self, pos: PropertyPos) -> Option<(SymbolId, NamedPropertyDescriptor)> {
        self.entries.get_index(pos.0).map(|(name, desc)| (*name, *desc))
    }

    pub fn descriptor_at_mut(&mut self, pos: PropertyPos) -> Option<&mut NamedPropertyDescriptor> {
        self.entries.get_index_mut(pos.0).map(|(_, desc)| desc)
    }

    /// Add a property that must not already exist.
    pub fn add(&mut self, name: SymbolId, desc: NamedPropertyDescriptor) -> PropertyPos {
        debug_assert!(!self.entries.contains_key(&name), "{} added twice", name);
        self.note_slot(desc.slot);
        let (index, _) = self.entries.insert_full(name, desc);
        PropertyPos(index)
    }

    /// Find `name`, inserting a placeholder entry if it is missing. The bool is
    /// true when the entry was inserted; the caller fills in the descriptor.
    pub fn find_or_add(&mut self, name: SymbolId) -> (&mut NamedPropertyDescriptor, bool) {
        let added = !self.entries.contains_key(&name);
        let desc = self
            .entries
            .entry(name)
            .or_insert(NamedPropertyDescriptor::new(Default::default(), 0));
        (desc, added)
    }

    /// Remove the entry at `pos`. Later positions shift down by one.
    pub fn erase(&mut self, pos: PropertyPos) -> Option<(SymbolId, NamedPropertyDescriptor)> {
        let removed = self.entries.shift_remove_index(pos.0)?;
        self.deleted_slots.push(removed.1.slot);
        Some(removed)
    }

    /// Slot for a new property: the most recently freed one, else a fresh one.
    pub fn allocate_property_slot(&mut self) -> SlotIndex {
        if let Some(slot) = self.deleted_slots.pop() {
            return slot;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    /// Record that `slot` is in use so fresh allocations start after it.
    pub(crate) fn note_slot(&mut self, slot: SlotIndex) {
        if slot >= self.next_slot {
            self.next_slot = slot + 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, NamedPropertyDescriptor)> + '_ {
        self.entries.iter().map(|(name, desc)| (*name, *desc))
    }

    pub fn for_each<F: FnMut(SymbolId, NamedPropertyDescriptor)>(&self, mut f: F) {
        for (name, desc) in self.iter() {
            f(name, desc);
        }
    }

    pub fn for_each_mut<F: FnMut(SymbolId, &mut NamedPropertyDescriptor)>(&mut self, mut f: F) {
        for (name, desc) in self.entries.iter_mut() {
            f(*name, desc);
        }
    }

    /// Approximate out-of-line bytes held by the table.
    pub fn memory_size(&self) -> usize {
        self.entries.capacity()
            * (std::mem::size_of::<SymbolId>() + std::mem::size_of::<NamedPropertyDescriptor>() + 8)
            + self.deleted_slots.capacity() * std::mem::size_of::<SlotIndex>()
    }
}
