//! Integration tests for shapes, organized by feature
//!
//! These tests exercise the shape tree through the public API.
//!
//! ## Aggressive Test Defaults
//!
//! Tests use aggressive defaults to catch bugs early:
//! - `GC_THRESHOLD=1` - collect on every allocation, so a node that is not
//!   properly rooted mid-operation disappears immediately
//!
//! Override via environment variables:
//!
//! ```bash
//! cargo test                           # Default: aggressive settings
//! GC_THRESHOLD=100 cargo test          # Less aggressive GC for faster runs
//! ```

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

mod dictionary;
mod flags;
mod gc;
mod iteration;

use shapecache::{PropertyFlags, Runtime, Shape, ShapeConfig, SlotIndex};

/// Create a runtime with aggressive defaults for testing:
/// - GC_THRESHOLD=1 (collect on every allocation) to catch GC bugs
pub fn create_test_runtime() -> Runtime {
    create_test_runtime_with(ShapeConfig::default())
}

/// Like `create_test_runtime`, starting from `config`.
pub fn create_test_runtime_with(config: ShapeConfig) -> Runtime {
    let gc_threshold = std::env::var("GC_THRESHOLD")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);
    Runtime::with_config(ShapeConfig {
        gc_threshold,
        ..config
    })
}

/// Add `name` with default flags.
pub fn add(rt: &Runtime, shape: &Shape, name: &str) -> Shape {
    add_with(rt, shape, name, PropertyFlags::default()).0
}

pub fn add_with(
    rt: &Runtime,
    shape: &Shape,
    name: &str,
    flags: PropertyFlags,
) -> (Shape, SlotIndex) {
    let sym = rt.intern(name);
    rt.add_property(shape, sym, flags).unwrap()
}

/// Shape reached from the root by adding `names` in order.
pub fn build(rt: &Runtime, names: &[&str]) -> Shape {
    names
        .iter()
        .fold(rt.root_shape(), |shape, name| add(rt, &shape, name))
}

/// Flags of `name` in `shape`, if present.
pub fn flags_of(rt: &Runtime, shape: &Shape, name: &str) -> Option<PropertyFlags> {
    let sym = rt.intern(name);
    rt.find_property(shape, sym, None).map(|(_, desc)| desc.flags)
}

/// Property names in enumeration order.
pub fn names_of(rt: &Runtime, shape: &Shape) -> Vec<String> {
    let mut names = Vec::new();
    rt.for_each_property(shape, |sym, _| {
        names.push(rt.symbol_name(sym).unwrap_or_else(|| sym.to_string()));
    });
    names
}
