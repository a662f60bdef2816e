//! Shape nodes: shared descriptions of an object's named properties.
//!
//! Objects that add the same properties in the same order end up pointing at
//! the same node. Nodes form a tree rooted at the runtime's empty shape; a child
//! holds its parent strongly and a parent reaches its children only through the
//! weak `TransitionTable`. A node that stops being shareable (too many
//! properties, a deletion) is replaced by a parentless dictionary node that is
//! owned by a single object and mutated in place.
//!
//! The operations live on `Runtime` because they allocate:
//! - `lookup`: find_property and friends, property iteration
//! - `mutate`: adding, updating and reserving properties in tree mode
//! - `dictionary`: conversion to dictionary mode and in-place updates
//! - `materialize`: lazy construction and stealing of property maps

mod dictionary;
mod lookup;
mod materialize;
mod mutate;

pub use lookup::FastLookup;

use crate::enumeration::EnumerationCache;
use crate::gc::{Gc, GcPtr, Traceable, WeakGc};
use crate::property::{PropertyFlags, SlotIndex};
use crate::property_map::PropertyMap;
use crate::symbol::SymbolId;
use crate::transition::TransitionTable;

/// A tree node never describes more than this many properties; adding one
/// more converts to dictionary mode.
pub const DICTIONARY_THRESHOLD: u32 = 64;

/// Handle to a shape node.
pub type Shape = Gc<ShapeNode>;

bitflags::bitflags! {
    /// Per-node state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClassFlags: u8 {
        /// Owned by one object and mutated in place.
        const DICTIONARY = 1 << 0;
        /// Dictionary whose identity no longer pins its layout; must stay out
        /// of property lookup caches.
        const NO_CACHE = 1 << 1;
        /// Some property name is a canonical array index.
        const HAS_INDEX_LIKE = 1 << 2;
        /// Known: no property is configurable.
        const ALL_NON_CONFIGURABLE = 1 << 3;
        /// Known: every property is read-only and non-configurable.
        const ALL_READ_ONLY = 1 << 4;
    }
}

/// What the edge into a node did to its parent's property set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Add {
        symbol: SymbolId,
        flags: PropertyFlags,
        slot: SlotIndex,
    },
    Update {
        symbol: SymbolId,
        flags: PropertyFlags,
    },
    Seal,
    Freeze,
}

impl Step {
    /// Flags of `symbol` after this step, given its flags before.
    pub(crate) fn apply_to(self, symbol: SymbolId, flags: PropertyFlags) -> PropertyFlags {
        match self {
            Step::Update { symbol: s, flags: f } if s == symbol => f,
            Step::Seal => flags.sealed(),
            Step::Freeze => flags.frozen(),
            _ => flags,
        }
    }

    pub(crate) fn apply_to_map(self, map: &mut PropertyMap) {
        match self {
            Step::Add {
                symbol,
                flags,
                slot,
            } => match map.find(symbol) {
                Some(pos) => {
                    if let Some(desc) = map.descriptor_at_mut(pos) {
                        desc.flags = flags;
                    }
                }
                None => {
                    map.add(
                        symbol,
                        crate::property::NamedPropertyDescriptor::new(flags, slot),
                    );
                }
            },
            Step::Update { symbol, flags } => {
                if let Some(pos) = map.find(symbol) {
                    if let Some(desc) = map.descriptor_at_mut(pos) {
                        desc.flags = flags;
                    }
                }
            }
            Step::Seal | Step::Freeze => {
                map.for_each_mut(|name, desc| desc.flags = self.apply_to(name, desc.flags));
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ShapeNode {
    /// Property added or updated by the edge into this node; `None` for the
    /// root and for dictionaries.
    pub(crate) symbol: Option<SymbolId>,
    /// Flags carried by that edge. Includes `FLAGS_TRANSITION` when the edge
    /// only changed flags.
    pub(crate) added_flags: PropertyFlags,
    pub(crate) class_flags: ClassFlags,
    pub(crate) num_properties: u32,
    pub(crate) parent: Option<Shape>,
    /// Materialized table. In tree mode at most one node of a chain holds it.
    pub(crate) property_map: Option<Box<PropertyMap>>,
    pub(crate) transitions: TransitionTable,
    pub(crate) enumeration_cache: Option<EnumerationCache>,
}

impl ShapeNode {
    pub fn property_count(&self) -> u32 {
        self.num_properties
    }

    pub fn is_dictionary(&self) -> bool {
        self.class_flags.contains(ClassFlags::DICTIONARY)
    }

    pub fn is_dictionary_no_cache(&self) -> bool {
        debug_assert!(
            !self.class_flags.contains(ClassFlags::NO_CACHE) || self.is_dictionary(),
            "no-cache set on a tree node"
        );
        self.class_flags.contains(ClassFlags::NO_CACHE)
    }

    /// True only if no transition was ever taken from this node. Can report
    /// false for a node whose children have all been collected.
    pub fn is_known_leaf(&self) -> bool {
        self.transitions.is_known_empty()
    }

    pub fn has_index_like_properties(&self) -> bool {
        self.class_flags.contains(ClassFlags::HAS_INDEX_LIKE)
    }

    pub fn class_flags(&self) -> ClassFlags {
        self.class_flags
    }

    pub fn has_property_map(&self) -> bool {
        self.property_map.is_some()
    }

    pub fn parent(&self) -> Option<&Shape> {
        self.parent.as_ref()
    }

    /// Symbol introduced by the edge into this node.
    pub fn added_symbol(&self) -> Option<SymbolId> {
        self.symbol
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    pub fn enumeration_cache(&self) -> Option<&EnumerationCache> {
        self.enumeration_cache.as_ref()
    }

    /// Install an enumeration cache. Dictionaries change in place, so they
    /// never keep one.
    pub fn set_enumeration_cache(&mut self, cache: EnumerationCache) {
        if !self.is_dictionary() {
            self.enumeration_cache = Some(cache);
        }
    }

    pub fn clear_enumeration_cache(&mut self) {
        self.enumeration_cache = None;
    }

    /// Drop the materialized table of a tree node; it is rebuilt on demand.
    /// Dictionary tables hold the only copy of their properties and are kept.
    pub fn clear_property_map(&mut self) {
        if !self.is_dictionary() {
            self.property_map = None;
        }
    }

    /// Out-of-line bytes held by this node.
    pub fn memory_size(&self) -> usize {
        self.transitions.memory_size()
            + self.property_map.as_ref().map_or(0, |m| m.memory_size())
            + self.enumeration_cache.as_ref().map_or(0, |c| c.memory_size())
    }

    /// Name used for this node in heap dumps.
    pub fn snapshot_name(&self) -> &'static str {
        if self.is_dictionary() {
            "ShapeNode(Dictionary)"
        } else {
            "ShapeNode"
        }
    }

    pub(crate) fn step(&self) -> Option<Step> {
        let symbol = self.symbol?;
        if !self.added_flags.contains(PropertyFlags::FLAGS_TRANSITION) {
            return Some(Step::Add {
                symbol,
                flags: self.added_flags,
                slot: self.num_properties.saturating_sub(1),
            });
        }
        if symbol == SymbolId::seal_marker() {
            Some(Step::Seal)
        } else if symbol == SymbolId::freeze_marker() {
            Some(Step::Freeze)
        } else {
            Some(Step::Update {
                symbol,
                flags: self.added_flags - PropertyFlags::FLAGS_TRANSITION,
            })
        }
    }

    /// Class flags for a tree child of this node whose edge leaves `symbol`
    /// with `flags`.
    pub(crate) fn child_class_flags(&self, symbol: SymbolId, flags: PropertyFlags) -> ClassFlags {
        let mut class_flags = self.class_flags
            & (ClassFlags::HAS_INDEX_LIKE
                | ClassFlags::ALL_NON_CONFIGURABLE
                | ClassFlags::ALL_READ_ONLY);
        if symbol.is_index_like() {
            class_flags |= ClassFlags::HAS_INDEX_LIKE;
        }
        narrow_class_flags(&mut class_flags, flags);
        class_flags
    }
}

/// Drop the "all" bits that a property with `flags` would violate.
pub(crate) fn narrow_class_flags(class_flags: &mut ClassFlags, flags: PropertyFlags) {
    if flags.contains(PropertyFlags::CONFIGURABLE) {
        class_flags.remove(ClassFlags::ALL_NON_CONFIGURABLE | ClassFlags::ALL_READ_ONLY);
    }
    if !flags.is_read_only() {
        class_flags.remove(ClassFlags::ALL_READ_ONLY);
    }
}

impl Traceable for ShapeNode {
    fn trace<F: FnMut(GcPtr<Self>)>(&self, mut visitor: F) {
        if let Some(parent) = &self.parent {
            visitor(parent.copy_ref());
        }
    }

    fn trace_weak<F: FnMut(&mut WeakGc<Self>)>(&mut self, mut visitor: F) {
        self.transitions.mark_weak_refs(&mut visitor);
        if let Some(cache) = &mut self.enumeration_cache {
            if !cache.mark_weak_refs(&mut visitor) {
                self.enumeration_cache = None;
            }
        }
    }

    fn release_memory(&mut self) -> bool {
        if self.is_dictionary() || self.property_map.is_none() {
            return false;
        }
        self.clear_property_map();
        true
    }
}
