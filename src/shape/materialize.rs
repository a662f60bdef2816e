//! Lazy property maps.
//!
//! A tree node normally has no map of its own. When one is needed it is taken
//! from the closest ancestor that has one, with the intervening edges replayed
//! on top; if no ancestor has a map it is rebuilt from the root. Either way the
//! chain keeps a single live map.

use crate::property_map::PropertyMap;
use crate::runtime::Runtime;

use super::{Shape, Step};

impl Runtime {
    /// Make sure `shape` holds a property map.
    ///
    /// Empty nodes have nothing to describe and are left without one.
    pub(crate) fn initialize_missing_property_map(&self, shape: &Shape) {
        {
            let node = shape.borrow();
            if node.property_map.is_some() || node.num_properties == 0 {
                return;
            }
        }

        // Steps from `shape` upwards, stopping at the first ancestor with a map.
        let mut steps: Vec<Step> = Vec::new();
        let mut donor: Option<Shape> = None;
        let mut current = shape.clone();
        loop {
            let parent = {
                let node = current.borrow();
                if let Some(step) = node.step() {
                    steps.push(step);
                }
                node.parent.clone()
            };
            let Some(parent) = parent else {
                break;
            };
            if parent.borrow().property_map.is_some() {
                donor = Some(parent);
                break;
            }
            current = parent;
        }

        let mut map = match &donor {
            Some(donor) => {
                tracing::trace!(
                    shape = shape.id(),
                    donor = donor.id(),
                    replayed = steps.len(),
                    "stealing property map"
                );
                donor.borrow_mut().property_map.take().unwrap_or_default()
            }
            None => {
                tracing::trace!(
                    shape = shape.id(),
                    replayed = steps.len(),
                    "building property map from root"
                );
                // Descendants may still hold a map built before this one.
                self.release_descendant_maps(shape);
                Box::new(PropertyMap::with_capacity(steps.len()))
            }
        };

        for step in steps.iter().rev() {
            step.apply_to_map(&mut map);
        }
        shape.borrow_mut().property_map = Some(map);
    }

    /// Drop the maps held by live tree descendants of `shape`.
    fn release_descendant_maps(&self, shape: &Shape) {
        let mut pending = shape.borrow().transitions.live_children();
        let mut released = 0usize;
        while let Some((_, child)) = pending.pop() {
            let had_map = child.borrow_mut().property_map.take().is_some();
            if had_map {
                // Nothing below a map holder can have one.
                released += 1;
                continue;
            }
            let grandchildren = child.borrow().transitions.live_children();
            pending.extend(grandchildren);
        }
        if released > 0 {
            tracing::trace!(shape = shape.id(), released, "released descendant maps");
        }
    }

    /// Number of nodes on the chain from `shape` to its root (inclusive) that
    /// hold a map. Always 0 or 1 for tree nodes.
    pub fn maps_on_chain(shape: &Shape) -> usize {
        let mut count = 0;
        let mut current: Option<Shape> = Some(shape.clone());
        while let Some(node) = current {
            let next = {
                let borrowed = node.borrow();
                if borrowed.property_map.is_some() {
                    count += 1;
                }
                borrowed.parent.clone()
            };
            current = next;
        }
        count
    }
}
