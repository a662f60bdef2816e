//! The runtime: heap, identifier table and the shared empty root.
//!
//! Shape operations are methods on `Runtime` because any of them may allocate.
//! They are spread over the `shape` submodules by concern.

use std::cell::RefCell;

use serde::Serialize;

use crate::config::ShapeConfig;
use crate::gc::{GcStats, Heap};
use crate::shape::{Shape, ShapeNode};
use crate::symbol::{IdentifierTable, SymbolId};

/// Owns every shape node. Shape handles must not be used after their runtime
/// is dropped.
pub struct Runtime {
    /// Declared before `heap` so it is released while the heap still exists.
    root: Shape,
    heap: Heap<ShapeNode>,
    identifiers: RefCell<IdentifierTable>,
    config: ShapeConfig,
}

/// Node counts by kind, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeStats {
    pub nodes: usize,
    pub dictionaries: usize,
    pub no_cache_dictionaries: usize,
    /// Nodes currently holding a materialized property map.
    pub property_maps: usize,
    pub live_transitions: usize,
    /// Out-of-line bytes held by all nodes.
    pub memory_bytes: usize,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(ShapeConfig::default())
    }

    pub fn with_config(config: ShapeConfig) -> Self {
        let heap = Heap::new();
        heap.set_gc_threshold(config.gc_threshold);
        // The root is exempt from the node limit; it exists for the whole
        // lifetime of the runtime.
        let root = heap.alloc_root();
        heap.set_max_live_objects(config.max_heap_objects);
        tracing::debug!(
            gc_threshold = config.gc_threshold,
            max_heap_objects = ?config.max_heap_objects,
            "shape runtime created"
        );
        Self {
            root,
            heap,
            identifiers: RefCell::new(IdentifierTable::new()),
            config,
        }
    }

    /// The single empty shape every object starts from.
    pub fn root_shape(&self) -> Shape {
        self.root.clone()
    }

    pub fn intern(&self, name: &str) -> SymbolId {
        self.identifiers.borrow_mut().intern(name)
    }

    /// Text of an interned symbol; `None` for internal symbols.
    pub fn symbol_name(&self, symbol: SymbolId) -> Option<String> {
        self.identifiers.borrow().name(symbol).map(str::to_owned)
    }

    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    pub(crate) fn heap(&self) -> &Heap<ShapeNode> {
        &self.heap
    }

    /// Set the GC threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&self, threshold: usize) {
        self.heap.set_gc_threshold(threshold);
    }

    /// Collect unreachable shapes and clear dead weak slots. Tree shapes also
    /// give up their property maps unless `release_property_maps` is off.
    pub fn collect_garbage(&self) {
        if self.config.release_property_maps {
            self.heap.collect_full();
        } else {
            self.heap.collect();
        }
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    pub fn shape_stats(&self) -> ShapeStats {
        let mut stats = ShapeStats::default();
        for shape in self.heap.live_objects() {
            let node = shape.borrow();
            stats.nodes += 1;
            if node.is_dictionary() {
                stats.dictionaries += 1;
            }
            if node.is_dictionary_no_cache() {
                stats.no_cache_dictionaries += 1;
            }
            if node.has_property_map() {
                stats.property_maps += 1;
            }
            stats.live_transitions += node.transitions().live_len();
            stats.memory_bytes += node.memory_size();
        }
        stats
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
