//! Property attributes and descriptors.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Attributes of a named property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PropertyFlags: u8 {
        const WRITABLE = 1 << 0;
        const ENUMERABLE = 1 << 1;
        const CONFIGURABLE = 1 << 2;
        /// Getter/setter pair rather than a data value.
        const ACCESSOR = 1 << 3;
        /// Engine-private slot, never enumerated.
        const INTERNAL = 1 << 4;
        /// Only ever set inside a transition key: the transition changed the
        /// flags of an existing property instead of adding one.
        const FLAGS_TRANSITION = 1 << 7;
    }
}

impl Default for PropertyFlags {
    /// Flags of a property created by plain assignment.
    fn default() -> Self {
        Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE
    }
}

impl PropertyFlags {
    /// Flags for an anonymous internal slot.
    pub const fn internal_slot() -> Self {
        Self::INTERNAL.union(Self::WRITABLE)
    }

    /// Clear `clear`, then set `set`.
    pub fn change_flags(&mut self, clear: PropertyFlags, set: PropertyFlags) {
        self.remove(clear);
        self.insert(set);
    }

    /// The flags `Object.freeze` leaves behind: data properties lose
    /// `writable` and `configurable`, accessors only `configurable`.
    pub fn frozen(self) -> Self {
        if self.contains(Self::ACCESSOR) {
            self - Self::CONFIGURABLE
        } else {
            self - Self::WRITABLE - Self::CONFIGURABLE
        }
    }

    /// The flags `Object.seal` leaves behind.
    pub fn sealed(self) -> Self {
        self - Self::CONFIGURABLE
    }

    /// Neither a writable data property nor configurable.
    pub fn is_read_only(self) -> bool {
        !self.contains(Self::CONFIGURABLE)
            && (self.contains(Self::ACCESSOR) || !self.contains(Self::WRITABLE))
    }

    pub fn is_valid(self) -> bool {
        !self.contains(Self::FLAGS_TRANSITION)
    }
}

/// Index into an object's slot storage.
pub type SlotIndex = u32;

/// Where a named property lives and how it behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NamedPropertyDescriptor {
    pub flags: PropertyFlags,
    pub slot: SlotIndex,
}

impl NamedPropertyDescriptor {
    pub fn new(flags: PropertyFlags, slot: SlotIndex) -> Self {
        Self { flags, slot }
    }
}

/// Position of an entry inside a materialized property map.
///
/// Only valid until the next operation that can rebuild, steal or shrink the
/// map; re-run `find_property` after any shape operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyPos(pub(crate) usize);

impl PropertyPos {
    pub fn index(self) -> usize {
        self.0
    }
}
