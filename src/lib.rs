//! Hidden-class shapes for a dynamic object model
//!
//! Objects that gain the same properties in the same order share one
//! `ShapeNode` describing the property names, their attribute flags and the
//! slot each value lives in. Shapes form a tree of transitions rooted at a
//! single empty shape; objects that stop fitting the tree (too many
//! properties, deletions) switch to a private dictionary shape.
//!
//! # Example
//!
//! ```
//! use shapecache::{PropertyFlags, Runtime};
//!
//! let rt = Runtime::new();
//! let root = rt.root_shape();
//! let (x, _) = rt.add_property(&root, rt.intern("x"), PropertyFlags::default()).unwrap();
//! let (xy, slot) = rt.add_property(&x, rt.intern("y"), PropertyFlags::default()).unwrap();
//!
//! // A second object taking the same steps ends up with the same shape.
//! let (again, _) = rt.add_property(&root, rt.intern("x"), PropertyFlags::default()).unwrap();
//! let (again, _) = rt.add_property(&again, rt.intern("y"), PropertyFlags::default()).unwrap();
//! assert_eq!(xy, again);
//!
//! let (_, desc) = rt.find_property(&xy, rt.intern("y"), None).unwrap();
//! assert_eq!(desc.slot, slot);
//! ```

pub mod config;
pub mod constructor_cache;
pub mod enumeration;
pub mod error;
pub mod gc;
pub mod property;
pub mod property_cache;
pub mod property_map;
pub mod runtime;
pub mod shape;
pub mod symbol;
pub mod transition;

pub use config::ShapeConfig;
pub use constructor_cache::{CachedShape, ConstructorShapeCache};
pub use enumeration::EnumerationCache;
pub use error::{Result, ShapeError};
pub use gc::{AllocError, GcStats};
pub use property::{NamedPropertyDescriptor, PropertyFlags, PropertyPos, SlotIndex};
pub use property_cache::PropertyCacheEntry;
pub use property_map::PropertyMap;
pub use runtime::{Runtime, ShapeStats};
pub use shape::{ClassFlags, DICTIONARY_THRESHOLD, FastLookup, Shape, ShapeNode};
pub use symbol::{IdentifierTable, SymbolId};
pub use transition::{Transition, TransitionTable};
