//! Per-call-site constructor shape cache.
//!
//! A construction site that keeps producing objects with the same prototype
//! chain also keeps producing the same final shape. The cache remembers the
//! prototype shapes it saw and the shape the new object ended up with, all held
//! weakly, so the next construction can jump straight to that shape instead of
//! replaying every `add_property`.

use crate::gc::WeakGc;
use crate::shape::{Shape, ShapeNode};

/// Longest prototype chain a site will cache.
pub const MAX_CACHED_PROTOTYPES: usize = 4;

/// State of the cached result.
#[derive(Debug, Clone, Default)]
pub enum CachedShape {
    #[default]
    Uninitialized,
    /// The site produced something that cannot be cached; never retry.
    Failed,
    Valid(WeakGc<ShapeNode>),
}

/// Prototype-chain to result-shape cache for one construction site.
#[derive(Debug, Clone, Default)]
pub struct ConstructorShapeCache {
    prototypes: Vec<WeakGc<ShapeNode>>,
    result: CachedShape,
}

impl ConstructorShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CachedShape {
        &self.result
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, CachedShape::Failed)
    }

    /// The cached result shape, if `prototype_chain` (nearest first) has
    /// exactly the shapes recorded and everything is still alive.
    pub fn lookup(&self, prototype_chain: &[Shape]) -> Option<Shape> {
        let CachedShape::Valid(result) = &self.result else {
            return None;
        };
        if self.prototypes.len() != prototype_chain.len() {
            return None;
        }
        let same_chain = self
            .prototypes
            .iter()
            .zip(prototype_chain)
            .all(|(cached, current)| cached.is_live() && cached.refers_to(current));
        if !same_chain {
            return None;
        }
        result.upgrade()
    }

    /// Remember that constructing through `prototype_chain` produced `shape`.
    ///
    /// Chains that are too long, or dictionaries anywhere, fail the site for
    /// good. So does a second, different result while the first is still live:
    /// a site that sees more than one layout is polymorphic and not worth
    /// caching.
    pub fn record(&mut self, prototype_chain: &[Shape], shape: &Shape) {
        if self.is_failed() {
            return;
        }
        if prototype_chain.len() > MAX_CACHED_PROTOTYPES {
            tracing::trace!(len = prototype_chain.len(), "prototype chain too long to cache");
            self.mark_failed();
            return;
        }
        let has_dictionary = shape.borrow().is_dictionary()
            || prototype_chain.iter().any(|p| p.borrow().is_dictionary());
        if has_dictionary {
            tracing::trace!(shape = shape.id(), "dictionary shape at construction site");
            self.mark_failed();
            return;
        }
        if let CachedShape::Valid(existing) = &self.result {
            if existing.is_live() && self.lookup(prototype_chain).is_none_or(|s| s != *shape) {
                tracing::trace!(shape = shape.id(), "construction site is polymorphic");
                self.mark_failed();
                return;
            }
        }

        self.prototypes = prototype_chain.iter().map(Shape::downgrade).collect();
        self.result = CachedShape::Valid(shape.downgrade());
    }

    pub fn mark_failed(&mut self) {
        self.prototypes.clear();
        self.result = CachedShape::Failed;
    }

    /// Hand every weak slot to the collector.
    pub fn mark_weak_refs<F: FnMut(&mut WeakGc<ShapeNode>)>(&mut self, mut visitor: F) {
        for prototype in &mut self.prototypes {
            visitor(prototype);
        }
        if let CachedShape::Valid(result) = &mut self.result {
            visitor(result);
        }
    }

    /// Forget the entry if any shape it refers to has died. Failed sites stay
    /// failed.
    pub fn sweep(&mut self) {
        let CachedShape::Valid(result) = &self.result else {
            return;
        };
        let dead = !result.is_live() || self.prototypes.iter().any(|p| !p.is_live());
        if dead {
            self.prototypes.clear();
            self.result = CachedShape::Uninitialized;
        }
    }
}
