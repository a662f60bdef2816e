//! Interned property names.
//!
//! Shapes never look at name text: a `SymbolId` is compared by identity and
//! carries one extra bit recording whether its text is a canonical array index,
//! so index-like properties can be tracked without going back to the table.

use rustc_hash::FxHashMap;

/// Set on symbols whose text is a canonical array index ("0", "17", ...).
const INDEX_LIKE_BIT: u32 = 1 << 31;

/// Number of anonymous internal slots `reserve_slot` can hand out.
pub const RESERVED_SLOT_COUNT: u32 = 4;

/// Marker for a batch transition that cleared `configurable` everywhere.
const SEAL_MARKER: u32 = RESERVED_SLOT_COUNT;

/// Marker for a batch transition that made every property read-only.
const FREEZE_MARKER: u32 = RESERVED_SLOT_COUNT + 1;

/// First id handed out by an `IdentifierTable`.
const FIRST_INTERNED: u32 = 16;

/// An interned property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Symbol naming the `index`-th anonymous internal slot.
    pub fn reserved_slot(index: u32) -> SymbolId {
        debug_assert!(index < RESERVED_SLOT_COUNT);
        SymbolId(index)
    }

    pub(crate) fn seal_marker() -> SymbolId {
        SymbolId(SEAL_MARKER)
    }

    pub(crate) fn freeze_marker() -> SymbolId {
        SymbolId(FREEZE_MARKER)
    }

    /// Whether this names an internal slot or marker rather than a real property.
    pub fn is_internal(self) -> bool {
        self.0 < FIRST_INTERNED
    }

    pub fn is_index_like(self) -> bool {
        self.0 & INDEX_LIKE_BIT != 0
    }

    /// Raw id, stable for the lifetime of the table that produced it.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            id if id < RESERVED_SLOT_COUNT => write!(f, "<internal {}>", id),
            SEAL_MARKER => f.write_str("<seal>"),
            FREEZE_MARKER => f.write_str("<freeze>"),
            id => write!(f, "#{}", id & !INDEX_LIKE_BIT),
        }
    }
}

/// Canonical array index check: digits only, no leading zeros, below 2^32 - 1.
pub fn is_array_index(s: &str) -> bool {
    let Some(first) = s.bytes().next() else {
        return false;
    };
    if !first.is_ascii_digit() {
        return false;
    }
    match s.parse::<u32>() {
        Ok(idx) => idx != u32::MAX && idx.to_string() == s,
        Err(_) => false,
    }
}

/// Maps property-name text to `SymbolId`s.
pub struct IdentifierTable {
    ids: FxHashMap<Box<str>, SymbolId>,
    /// Indexed by `id - FIRST_INTERNED` (with the index-like bit masked off).
    names: Vec<Box<str>>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            names: Vec::new(),
        }
    }

    /// Get the symbol for `name`, creating it if needed.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let raw = raw_id_for(self.names.len());
        assert!(raw.is_some(), "identifier table full");
        let raw = raw.unwrap_or_default();
        let id = if is_array_index(name) {
            SymbolId(raw | INDEX_LIKE_BIT)
        } else {
            SymbolId(raw)
        };
        self.names.push(name.into());
        self.ids.insert(name.into(), id);
        id
    }

    /// Look up an existing symbol without interning.
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    /// Text of an interned symbol. Internal symbols have no text.
    pub fn name(&self, id: SymbolId) -> Option<&str> {
        let raw = (id.0 & !INDEX_LIKE_BIT).checked_sub(FIRST_INTERNED)?;
        self.names.get(raw as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Raw id of the `index`-th interned name. `None` once ids would run into the
/// index-like tag bit.
fn raw_id_for(index: usize) -> Option<u32> {
    u32::try_from(index)
        .ok()
        .and_then(|n| n.checked_add(FIRST_INTERNED))
        .filter(|raw| raw & INDEX_LIKE_BIT == 0)
}

impl Default for IdentifierTable {
    fn default() -> Self {
        Self::new()
    }
}
