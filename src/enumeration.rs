//! Cached for-in name lists.
//!
//! Enumerating an object walks its own enumerable properties and then those of
//! each prototype, skipping shadowed names. The result only depends on the
//! shapes involved, so a tree shape can keep the list together with the
//! prototype shapes it was computed against. A later enumeration reuses the list
//! if the prototype chain still has exactly those shapes.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::gc::WeakGc;
use crate::property::PropertyFlags;
use crate::runtime::Runtime;
use crate::shape::{Shape, ShapeNode};
use crate::symbol::SymbolId;

/// Names produced by a for-in over an object, valid for one prototype chain.
#[derive(Debug, Clone)]
pub struct EnumerationCache {
    prototype_shapes: Vec<WeakGc<ShapeNode>>,
    names: Rc<[SymbolId]>,
}

impl EnumerationCache {
    pub fn new(prototype_chain: &[Shape], names: Rc<[SymbolId]>) -> Self {
        Self {
            prototype_shapes: prototype_chain.iter().map(Shape::downgrade).collect(),
            names,
        }
    }

    pub fn names(&self) -> &Rc<[SymbolId]> {
        &self.names
    }

    /// Whether the list was built against exactly these prototype shapes.
    pub fn matches(&self, prototype_chain: &[Shape]) -> bool {
        self.prototype_shapes.len() == prototype_chain.len()
            && self
                .prototype_shapes
                .iter()
                .zip(prototype_chain)
                .all(|(cached, current)| cached.is_live() && cached.refers_to(current))
    }

    /// Hand the prototype slots to the collector. Returns false if any of them
    /// was cleared, in which case the cache can never match again.
    pub(crate) fn mark_weak_refs<F: FnMut(&mut WeakGc<ShapeNode>)>(
        &mut self,
        visitor: &mut F,
    ) -> bool {
        for shape in &mut self.prototype_shapes {
            visitor(shape);
        }
        self.prototype_shapes.iter().all(|shape| !shape.is_cleared())
    }

    pub fn memory_size(&self) -> usize {
        self.prototype_shapes.capacity() * std::mem::size_of::<WeakGc<ShapeNode>>()
            + self.names.len() * std::mem::size_of::<SymbolId>()
    }
}

impl Runtime {
    /// Names a for-in over an object with `shape` and the given prototype
    /// shapes (nearest first) would visit, own properties first.
    ///
    /// Served from the shape's cache when the prototype chain matches; a stale
    /// cache is dropped and, when allowed, replaced.
    pub fn enumerable_property_names(
        &self,
        shape: &Shape,
        prototype_chain: &[Shape],
    ) -> Rc<[SymbolId]> {
        {
            let mut node = shape.borrow_mut();
            match node.enumeration_cache() {
                Some(cache) if cache.matches(prototype_chain) => {
                    return Rc::clone(cache.names());
                }
                Some(_) => {
                    tracing::trace!(shape = shape.id(), "enumeration cache mismatch");
                    node.clear_enumeration_cache();
                }
                None => {}
            }
        }

        let (names, cacheable) = self.collect_enumerable_names(shape, prototype_chain);
        if cacheable {
            shape
                .borrow_mut()
                .set_enumeration_cache(EnumerationCache::new(prototype_chain, Rc::clone(&names)));
        }
        names
    }

    /// Build a cache entry for `shape`, or `None` if the result should not be
    /// cached: a dictionary is involved, or prototype entries would make up
    /// most of the list.
    pub fn build_enumeration_cache(
        &self,
        shape: &Shape,
        prototype_chain: &[Shape],
    ) -> Option<EnumerationCache> {
        let (names, cacheable) = self.collect_enumerable_names(shape, prototype_chain);
        cacheable.then(|| EnumerationCache::new(prototype_chain, names))
    }

    fn collect_enumerable_names(
        &self,
        shape: &Shape,
        prototype_chain: &[Shape],
    ) -> (Rc<[SymbolId]>, bool) {
        let mut seen: FxHashSet<SymbolId> = FxHashSet::default();
        let mut names: Vec<SymbolId> = Vec::new();
        let mut any_dictionary = shape.borrow().is_dictionary();

        // Shadowing is decided by presence, not enumerability.
        let mut visit = |runtime: &Runtime, source: &Shape, names: &mut Vec<SymbolId>| {
            runtime.for_each_property(source, |name, desc| {
                if name.is_internal() || !seen.insert(name) {
                    return;
                }
                if desc.flags.contains(PropertyFlags::ENUMERABLE) {
                    names.push(name);
                }
            });
        };

        visit(self, shape, &mut names);
        // Measured against every own property, enumerable or not.
        let own_count = shape.borrow().property_count() as usize;
        for prototype in prototype_chain {
            any_dictionary |= prototype.borrow().is_dictionary();
            visit(self, prototype, &mut names);
        }

        let entries = prototype_chain.len() + 1 + names.len();
        let too_much_proto = entries / 4 > own_count;
        let cacheable = !any_dictionary && !too_much_proto;
        if !cacheable {
            tracing::trace!(
                shape = shape.id(),
                any_dictionary,
                own = own_count,
                total = names.len(),
                "enumeration result not cached"
            );
        }
        (names.into(), cacheable)
    }
}
