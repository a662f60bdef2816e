//! Dictionary mode.
//!
//! A dictionary node is parentless, owned by a single object and edited in
//! place. Plain dictionaries may still be used as keys in lookup caches: their
//! existing properties never move, only new ones get added. Once a property is
//! deleted or has its flags changed the node becomes "no-cache" and every
//! further edit happens in place.

use crate::error::Result;
use crate::property::{PropertyFlags, PropertyPos};
use crate::property_map::PropertyMap;
use crate::runtime::Runtime;

use super::{ClassFlags, Shape};

impl Runtime {
    /// Copy `shape` into a fresh parentless dictionary node, moving its
    /// property map (materialized first if needed) into the copy.
    ///
    /// `shape` must not already be a no-cache dictionary. A tree source stays
    /// usable (its map is rebuilt on demand); a dictionary source is left
    /// empty-handed and must be abandoned by its owner.
    pub fn copy_to_new_dictionary(&self, shape: &Shape, no_cache: bool) -> Result<Shape> {
        debug_assert!(
            !shape.borrow().is_dictionary_no_cache(),
            "copying a no-cache dictionary"
        );

        // Allocate before touching `shape` so a failure leaves it intact.
        let guard = self.heap().create_guard();
        let dictionary = guard.try_alloc()?;

        let count = shape.borrow().num_properties;
        let map = if count == 0 {
            Box::new(PropertyMap::new())
        } else {
            self.initialize_missing_property_map(shape);
            shape
                .borrow_mut()
                .property_map
                .take()
                .unwrap_or_default()
        };

        let mut class_flags = shape.borrow().class_flags | ClassFlags::DICTIONARY;
        if no_cache {
            class_flags |= ClassFlags::NO_CACHE;
        }
        {
            let mut node = dictionary.borrow_mut();
            node.class_flags = class_flags;
            node.num_properties = count;
            node.property_map = Some(map);
        }
        tracing::trace!(
            shape = shape.id(),
            dictionary = dictionary.id(),
            no_cache,
            properties = count,
            "copied to dictionary"
        );
        Ok(dictionary)
    }

    /// Remove the property at `pos` (as returned by `find_property` on this
    /// same shape). The result is always a dictionary: deleting from a tree
    /// node yields a plain one, deleting from a dictionary a no-cache one. The
    /// freed slot is handed out again by the next addition.
    pub fn delete_property(&self, shape: &Shape, pos: PropertyPos) -> Result<Shape> {
        let target = if shape.borrow().is_dictionary_no_cache() {
            shape.clone()
        } else {
            let no_cache = shape.borrow().is_dictionary();
            self.copy_to_new_dictionary(shape, no_cache)?
        };

        {
            let mut node = target.borrow_mut();
            let erased = node
                .property_map
                .as_mut()
                .and_then(|map| map.erase(pos));
            assert!(erased.is_some(), "stale property position");
            node.num_properties = node.num_properties.saturating_sub(1);
            if let Some((name, desc)) = erased {
                tracing::trace!(
                    shape = shape.id(),
                    result = target.id(),
                    symbol = %name,
                    slot = desc.slot,
                    "deleted property"
                );
            }
        }
        Ok(target)
    }

    /// Set and clear flags on the given properties (all of them if
    /// `properties` is `None`) without creating transitions.
    ///
    /// Tree nodes are converted to a dictionary first, cacheable dictionaries
    /// to a no-cache one; a no-cache dictionary is edited in place.
    pub fn update_property_flags_without_transitions(
        &self,
        shape: &Shape,
        clear: PropertyFlags,
        set: PropertyFlags,
        properties: Option<&[crate::symbol::SymbolId]>,
    ) -> Result<Shape> {
        debug_assert!(
            clear.is_valid() && set.is_valid(),
            "transition marker in property flags"
        );

        let target = {
            let (is_dictionary, no_cache) = {
                let node = shape.borrow();
                (node.is_dictionary(), node.is_dictionary_no_cache())
            };
            if no_cache {
                shape.clone()
            } else {
                self.copy_to_new_dictionary(shape, is_dictionary)?
            }
        };

        let mut changed = 0usize;
        {
            let mut node = target.borrow_mut();
            if let Some(map) = node.property_map.as_mut() {
                let mut apply = |desc: &mut crate::property::NamedPropertyDescriptor| {
                    let mut flags = desc.flags;
                    flags.change_flags(clear, set);
                    if flags != desc.flags {
                        desc.flags = flags;
                        changed += 1;
                    }
                };
                match properties {
                    Some(names) => {
                        for name in names {
                            if let Some(desc) =
                                map.find(*name).and_then(|pos| map.descriptor_at_mut(pos))
                            {
                                apply(desc);
                            }
                        }
                    }
                    None => map.for_each_mut(|_, desc| apply(desc)),
                }
            }

            if set.contains(PropertyFlags::CONFIGURABLE) {
                node.class_flags
                    .remove(ClassFlags::ALL_NON_CONFIGURABLE | ClassFlags::ALL_READ_ONLY);
            }
            if set.contains(PropertyFlags::WRITABLE) || clear.contains(PropertyFlags::ACCESSOR) {
                node.class_flags.remove(ClassFlags::ALL_READ_ONLY);
            }
        }
        tracing::trace!(
            shape = shape.id(),
            result = target.id(),
            changed,
            "updated flags without transitions"
        );
        Ok(target)
    }
}
