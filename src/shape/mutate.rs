//! Tree-mode transitions: adding properties, changing flags, batch freezes.

use crate::error::{Result, ShapeError};
use crate::gc::Gc;
use crate::property::{NamedPropertyDescriptor, PropertyFlags, PropertyPos, SlotIndex};
use crate::runtime::Runtime;
use crate::symbol::{RESERVED_SLOT_COUNT, SymbolId};
use crate::transition::Transition;

use super::{ClassFlags, DICTIONARY_THRESHOLD, Shape, ShapeNode, Step, narrow_class_flags};

/// Whole-object flag narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Batch {
    /// Clear `configurable` on every property.
    Seal,
    /// Make every property read-only and non-configurable.
    Freeze,
}

impl Batch {
    fn step(self) -> Step {
        match self {
            Batch::Seal => Step::Seal,
            Batch::Freeze => Step::Freeze,
        }
    }

    fn marker(self) -> SymbolId {
        match self {
            Batch::Seal => SymbolId::seal_marker(),
            Batch::Freeze => SymbolId::freeze_marker(),
        }
    }

    fn class_bits(self) -> ClassFlags {
        match self {
            Batch::Seal => ClassFlags::ALL_NON_CONFIGURABLE,
            Batch::Freeze => ClassFlags::ALL_NON_CONFIGURABLE | ClassFlags::ALL_READ_ONLY,
        }
    }

    fn transition(self) -> Transition {
        Transition::new(self.marker(), PropertyFlags::FLAGS_TRANSITION)
    }
}

impl Runtime {
    /// Add property `name` with `flags`, returning the resulting shape and the
    /// slot assigned to the property.
    ///
    /// Tree nodes reuse an existing transition when there is one, so objects
    /// adding the same properties in the same order share the result. A tree
    /// node already holding `DICTIONARY_THRESHOLD` properties converts to a
    /// dictionary first. Dictionaries are updated in place.
    pub fn add_property(
        &self,
        shape: &Shape,
        name: SymbolId,
        flags: PropertyFlags,
    ) -> Result<(Shape, SlotIndex)> {
        debug_assert!(flags.is_valid(), "transition marker in property flags");

        let (is_dictionary, count) = {
            let node = shape.borrow();
            (node.is_dictionary(), node.num_properties)
        };
        let max = self.config().max_property_slots;
        if count >= max {
            return Err(ShapeError::slot_limit(count.saturating_add(1), max));
        }

        if is_dictionary {
            let slot = add_to_dictionary(&mut shape.borrow_mut(), name, flags);
            tracing::trace!(shape = shape.id(), symbol = %name, slot, "added to dictionary");
            return Ok((shape.clone(), slot));
        }

        let key = Transition::new(name, flags);
        let existing = shape.borrow().transitions.lookup(&key);
        if let Some(child) = existing {
            tracing::trace!(
                shape = shape.id(),
                child = child.id(),
                symbol = %name,
                "reusing transition"
            );
            hand_map_to_child(shape, &child, |map| {
                map.add(name, NamedPropertyDescriptor::new(flags, count));
            });
            return Ok((child, count));
        }

        if count >= DICTIONARY_THRESHOLD {
            let dictionary = self.copy_to_new_dictionary(shape, false)?;
            let slot = add_to_dictionary(&mut dictionary.borrow_mut(), name, flags);
            tracing::trace!(
                shape = shape.id(),
                dictionary = dictionary.id(),
                symbol = %name,
                "threshold reached, converted to dictionary"
            );
            return Ok((dictionary, slot));
        }

        let guard = self.heap().create_guard();
        let child = guard.try_alloc()?;
        {
            let class_flags = shape.borrow().child_class_flags(name, flags);
            let mut node = child.borrow_mut();
            node.symbol = Some(name);
            node.added_flags = flags;
            node.class_flags = class_flags;
            node.num_properties = count + 1;
            node.parent = Some(shape.clone());
        }
        let inserted = shape.borrow_mut().transitions.insert_new(key, &child);
        debug_assert!(inserted, "transition already present");

        hand_map_to_child(shape, &child, |map| {
            map.add(name, NamedPropertyDescriptor::new(flags, count));
        });
        tracing::trace!(
            shape = shape.id(),
            child = child.id(),
            symbol = %name,
            slot = count,
            "new transition"
        );
        Ok((child, count))
    }

    /// Change the flags of the property at `pos` (as returned by
    /// `find_property` on this same shape).
    ///
    /// In tree mode this is another labeled transition, keyed by the symbol and
    /// the new flags, so independent objects making the same change converge.
    /// Dictionaries are updated in place once they are out of lookup caches;
    /// a still-cacheable dictionary is first copied into a no-cache one.
    pub fn update_property(
        &self,
        shape: &Shape,
        pos: PropertyPos,
        new_flags: PropertyFlags,
    ) -> Result<Shape> {
        debug_assert!(new_flags.is_valid(), "transition marker in property flags");

        if shape.borrow().is_dictionary() {
            let target = if shape.borrow().is_dictionary_no_cache() {
                shape.clone()
            } else {
                self.copy_to_new_dictionary(shape, true)?
            };
            {
                let mut node = target.borrow_mut();
                let node = &mut *node;
                let desc = node
                    .property_map
                    .as_mut()
                    .and_then(|map| map.descriptor_at_mut(pos));
                assert!(desc.is_some(), "stale property position");
                if let Some(desc) = desc {
                    desc.flags = new_flags;
                }
                narrow_class_flags(&mut node.class_flags, new_flags);
            }
            tracing::trace!(
                shape = shape.id(),
                result = target.id(),
                "updated dictionary property"
            );
            return Ok(target);
        }

        let entry = shape
            .borrow()
            .property_map
            .as_ref()
            .and_then(|map| map.descriptor_at(pos));
        assert!(entry.is_some(), "stale property position");
        let Some((name, old)) = entry else {
            return Ok(shape.clone());
        };
        if old.flags == new_flags {
            return Ok(shape.clone());
        }

        let key = Transition::flags_update(name, new_flags);
        let existing = shape.borrow().transitions.lookup(&key);
        if let Some(child) = existing {
            tracing::trace!(
                shape = shape.id(),
                child = child.id(),
                symbol = %name,
                "reusing flags transition"
            );
            hand_map_to_child(shape, &child, |map| set_flags_at(map, pos, new_flags));
            return Ok(child);
        }

        let guard = self.heap().create_guard();
        let child = guard.try_alloc()?;
        {
            let (class_flags, count) = {
                let node = shape.borrow();
                (node.child_class_flags(name, new_flags), node.num_properties)
            };
            let mut node = child.borrow_mut();
            node.symbol = Some(name);
            node.added_flags = key.flags;
            node.class_flags = class_flags;
            node.num_properties = count;
            node.parent = Some(shape.clone());
        }
        let inserted = shape.borrow_mut().transitions.insert_new(key, &child);
        debug_assert!(inserted, "flags transition already present");

        hand_map_to_child(shape, &child, |map| set_flags_at(map, pos, new_flags));
        tracing::trace!(
            shape = shape.id(),
            child = child.id(),
            symbol = %name,
            "new flags transition"
        );
        Ok(child)
    }

    /// Clear `configurable` on every property.
    pub fn make_all_non_configurable(&self, shape: &Shape) -> Result<Shape> {
        self.apply_batch(shape, Batch::Seal)
    }

    /// Make every property non-configurable, and every data property
    /// non-writable.
    pub fn make_all_read_only(&self, shape: &Shape) -> Result<Shape> {
        self.apply_batch(shape, Batch::Freeze)
    }

    fn apply_batch(&self, shape: &Shape, batch: Batch) -> Result<Shape> {
        let bits = batch.class_bits();
        if shape.borrow().class_flags.contains(bits) {
            return Ok(shape.clone());
        }

        let step = batch.step();
        let changes = self
            .property_entries(shape)
            .iter()
            .any(|(name, desc)| step.apply_to(*name, desc.flags) != desc.flags);
        if !changes {
            shape.borrow_mut().class_flags |= bits;
            return Ok(shape.clone());
        }

        if shape.borrow().is_dictionary() {
            let target = if shape.borrow().is_dictionary_no_cache() {
                shape.clone()
            } else {
                self.copy_to_new_dictionary(shape, true)?
            };
            {
                let mut node = target.borrow_mut();
                if let Some(map) = node.property_map.as_mut() {
                    step.apply_to_map(map);
                }
                node.class_flags |= bits;
            }
            tracing::trace!(
                shape = shape.id(),
                result = target.id(),
                ?batch,
                "batch update in dictionary"
            );
            return Ok(target);
        }

        let key = batch.transition();
        let existing = shape.borrow().transitions.lookup(&key);
        if let Some(child) = existing {
            hand_map_to_child(shape, &child, |map| step.apply_to_map(map));
            return Ok(child);
        }

        let guard = self.heap().create_guard();
        let child = guard.try_alloc()?;
        {
            let (class_flags, count) = {
                let node = shape.borrow();
                let inherited = node.class_flags
                    & (ClassFlags::HAS_INDEX_LIKE
                        | ClassFlags::ALL_NON_CONFIGURABLE
                        | ClassFlags::ALL_READ_ONLY);
                (inherited | bits, node.num_properties)
            };
            let mut node = child.borrow_mut();
            node.symbol = Some(batch.marker());
            node.added_flags = key.flags;
            node.class_flags = class_flags;
            node.num_properties = count;
            node.parent = Some(shape.clone());
        }
        let inserted = shape.borrow_mut().transitions.insert_new(key, &child);
        debug_assert!(inserted, "batch transition already present");

        hand_map_to_child(shape, &child, |map| step.apply_to_map(map));
        tracing::trace!(shape = shape.id(), child = child.id(), ?batch, "new batch transition");
        Ok(child)
    }

    /// Add the next anonymous internal slot. Only valid on tree nodes with
    /// fewer than `RESERVED_SLOT_COUNT` properties.
    pub fn reserve_slot(&self, shape: &Shape) -> Result<(Shape, SlotIndex)> {
        let (is_dictionary, index) = {
            let node = shape.borrow();
            (node.is_dictionary(), node.num_properties)
        };
        assert!(!is_dictionary, "reserved slots require a tree shape");
        assert!(index < RESERVED_SLOT_COUNT, "reserved slot index too large");
        self.add_property(
            shape,
            SymbolId::reserved_slot(index),
            PropertyFlags::internal_slot(),
        )
    }
}

/// Add `name` to a dictionary node in place.
fn add_to_dictionary(node: &mut ShapeNode, name: SymbolId, flags: PropertyFlags) -> SlotIndex {
    if name.is_index_like() {
        node.class_flags |= ClassFlags::HAS_INDEX_LIKE;
    }
    narrow_class_flags(&mut node.class_flags, flags);
    let map = node.property_map.get_or_insert_with(Box::default);
    let slot = map.allocate_property_slot();
    map.add(name, NamedPropertyDescriptor::new(flags, slot));
    node.num_properties += 1;
    slot
}

/// Move `parent`'s map (if any) to `child`, updated by `edit`, unless `child`
/// already has one. Either way `parent` ends up without a map.
fn hand_map_to_child<F>(parent: &Shape, child: &Gc<ShapeNode>, edit: F)
where
    F: FnOnce(&mut crate::property_map::PropertyMap),
{
    let Some(mut map) = parent.borrow_mut().property_map.take() else {
        return;
    };
    let mut child_node = child.borrow_mut();
    if child_node.property_map.is_none() {
        edit(&mut map);
        child_node.property_map = Some(map);
    }
}

fn set_flags_at(
    map: &mut crate::property_map::PropertyMap,
    pos: PropertyPos,
    flags: PropertyFlags,
) {
    if let Some(desc) = map.descriptor_at_mut(pos) {
        desc.flags = flags;
    }
}
