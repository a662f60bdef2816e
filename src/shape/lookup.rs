//! Property lookup and iteration.

use crate::property::{NamedPropertyDescriptor, PropertyFlags, PropertyPos};
use crate::runtime::Runtime;
use crate::symbol::SymbolId;
use crate::transition::Transition;

use super::{ClassFlags, Shape, Step};

/// Result of a lookup that refuses to do any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastLookup {
    Found(PropertyPos, NamedPropertyDescriptor),
    Missing,
    /// The node has no materialized map; use `find_property`.
    Unknown,
}

impl Runtime {
    /// Look up `name` in `shape`.
    ///
    /// Uses the materialized map when there is one. Otherwise, if the caller
    /// knows the flags the property would be added with, an outgoing
    /// transition for `(name, flags)` proves the property is absent without
    /// building anything. Failing both, the map is materialized and searched.
    pub fn find_property(
        &self,
        shape: &Shape,
        name: SymbolId,
        expected_flags: Option<PropertyFlags>,
    ) -> Option<(PropertyPos, NamedPropertyDescriptor)> {
        {
            let node = shape.borrow();
            if node.num_properties == 0 {
                return None;
            }
            if let Some(map) = &node.property_map {
                return lookup_in(map, name);
            }
            if let Some(flags) = expected_flags {
                if node.transitions.contains_key(&Transition::new(name, flags)) {
                    tracing::trace!(
                        shape = shape.id(),
                        symbol = %name,
                        "property absent: outgoing transition exists"
                    );
                    return None;
                }
            }
        }

        self.initialize_missing_property_map(shape);
        let node = shape.borrow();
        node.property_map
            .as_ref()
            .and_then(|map| lookup_in(map, name))
    }

    /// Answer from an existing map only.
    pub fn try_find_property_fast(&self, shape: &Shape, name: SymbolId) -> FastLookup {
        let node = shape.borrow();
        if node.num_properties == 0 {
            return FastLookup::Missing;
        }
        match &node.property_map {
            Some(map) => match lookup_in(map, name) {
                Some((pos, desc)) => FastLookup::Found(pos, desc),
                None => FastLookup::Missing,
            },
            None => FastLookup::Unknown,
        }
    }

    /// Look up `name` without materializing a map or touching the heap.
    pub fn find_property_no_alloc(
        &self,
        shape: &Shape,
        name: SymbolId,
    ) -> Option<NamedPropertyDescriptor> {
        // Batch edges seen so far, newest first. They apply on top of whatever
        // flags are found further up.
        let mut later: Vec<Step> = Vec::new();
        let mut resolved_flags: Option<PropertyFlags> = None;
        let mut current = Some(shape.clone());

        while let Some(node_ref) = current {
            let next = {
                let node = node_ref.borrow();
                if let Some(map) = &node.property_map {
                    let desc = map.get(name)?;
                    let flags = resolved_flags.unwrap_or(desc.flags);
                    return Some(NamedPropertyDescriptor::new(
                        replay_newest_first(&later, name, flags),
                        desc.slot,
                    ));
                }
                match node.step() {
                    Some(Step::Add {
                        symbol,
                        flags,
                        slot,
                    }) if symbol == name => {
                        let flags = resolved_flags.unwrap_or(flags);
                        return Some(NamedPropertyDescriptor::new(
                            replay_newest_first(&later, name, flags),
                            slot,
                        ));
                    }
                    Some(Step::Update { symbol, flags }) if symbol == name => {
                        if resolved_flags.is_none() {
                            resolved_flags = Some(replay_newest_first(&later, name, flags));
                            later.clear();
                        }
                    }
                    Some(step @ (Step::Seal | Step::Freeze)) => {
                        if resolved_flags.is_none() {
                            later.push(step);
                        }
                    }
                    _ => {}
                }
                node.parent.clone()
            };
            current = next;
        }
        None
    }

    /// Slow existence check that never builds a map.
    pub fn debug_is_property_defined(&self, shape: &Shape, name: SymbolId) -> bool {
        let mut current = Some(shape.clone());
        while let Some(node_ref) = current {
            let next = {
                let node = node_ref.borrow();
                if let Some(map) = &node.property_map {
                    return map.find(name).is_some();
                }
                if node.symbol == Some(name) {
                    return true;
                }
                node.parent.clone()
            };
            current = next;
        }
        false
    }

    /// Call `f` for every property in insertion order, materializing the map
    /// first. `f` may freely use the runtime.
    pub fn for_each_property<F>(&self, shape: &Shape, mut f: F)
    where
        F: FnMut(SymbolId, NamedPropertyDescriptor),
    {
        for (name, desc) in self.property_entries(shape) {
            f(name, desc);
        }
    }

    /// Like `for_each_property`, stopping as soon as `f` returns false.
    /// Returns false if iteration stopped early.
    pub fn for_each_property_while<F>(&self, shape: &Shape, mut f: F) -> bool
    where
        F: FnMut(SymbolId, NamedPropertyDescriptor) -> bool,
    {
        self.property_entries(shape)
            .into_iter()
            .all(|(name, desc)| f(name, desc))
    }

    /// Visit every property without materializing a map.
    ///
    /// `f` must not create or modify shapes: the node holding the nearest map
    /// stays borrowed while it runs.
    pub fn for_each_property_no_alloc<F>(&self, shape: &Shape, mut f: F)
    where
        F: FnMut(SymbolId, NamedPropertyDescriptor),
    {
        let mut steps: Vec<Step> = Vec::new();
        let mut holder: Option<Shape> = None;
        let mut current = Some(shape.clone());
        while let Some(node_ref) = current {
            let next = {
                let node = node_ref.borrow();
                if node.property_map.is_some() {
                    holder = Some(node_ref.clone());
                    None
                } else {
                    if let Some(step) = node.step() {
                        steps.push(step);
                    }
                    node.parent.clone()
                }
            };
            current = next;
        }
        // Oldest edge first.
        steps.reverse();

        if let Some(holder) = &holder {
            let node = holder.borrow();
            if let Some(map) = &node.property_map {
                map.for_each(|name, desc| {
                    f(
                        name,
                        NamedPropertyDescriptor::new(replay(&steps, name, desc.flags), desc.slot),
                    );
                });
            }
        }

        for (i, step) in steps.iter().enumerate() {
            if let Step::Add {
                symbol,
                flags,
                slot,
            } = *step
            {
                let rest = steps.get(i + 1..).unwrap_or_default();
                f(
                    symbol,
                    NamedPropertyDescriptor::new(replay(rest, symbol, flags), slot),
                );
            }
        }
    }

    /// True if no property is configurable. Caches a positive answer.
    pub fn are_all_non_configurable(&self, shape: &Shape) -> bool {
        if shape
            .borrow()
            .class_flags
            .contains(ClassFlags::ALL_NON_CONFIGURABLE)
        {
            return true;
        }
        let all = self.for_each_property_while(shape, |_, desc| {
            !desc.flags.contains(PropertyFlags::CONFIGURABLE)
        });
        if all {
            shape.borrow_mut().class_flags |= ClassFlags::ALL_NON_CONFIGURABLE;
        }
        all
    }

    /// True if every property is read-only and non-configurable. Caches a
    /// positive answer.
    pub fn are_all_read_only(&self, shape: &Shape) -> bool {
        if shape.borrow().class_flags.contains(ClassFlags::ALL_READ_ONLY) {
            return true;
        }
        let all = self.for_each_property_while(shape, |_, desc| desc.flags.is_read_only());
        if all {
            shape.borrow_mut().class_flags |=
                ClassFlags::ALL_NON_CONFIGURABLE | ClassFlags::ALL_READ_ONLY;
        }
        all
    }

    /// Snapshot of all `(name, descriptor)` pairs in insertion order.
    pub(crate) fn property_entries(
        &self,
        shape: &Shape,
    ) -> Vec<(SymbolId, NamedPropertyDescriptor)> {
        self.initialize_missing_property_map(shape);
        let node = shape.borrow();
        let mut entries = Vec::with_capacity(node.num_properties as usize);
        if let Some(map) = &node.property_map {
            map.for_each(|name, desc| entries.push((name, desc)));
        }
        entries
    }
}

fn lookup_in(
    map: &crate::property_map::PropertyMap,
    name: SymbolId,
) -> Option<(PropertyPos, NamedPropertyDescriptor)> {
    let pos = map.find(name)?;
    map.descriptor_at(pos).map(|(_, desc)| (pos, desc))
}

fn replay_newest_first(steps: &[Step], name: SymbolId, flags: PropertyFlags) -> PropertyFlags {
    steps
        .iter()
        .rev()
        .fold(flags, |flags, step| step.apply_to(name, flags))
}

/// Apply `steps` (oldest first) to the flags of `name`.
fn replay(steps: &[Step], name: SymbolId, flags: PropertyFlags) -> PropertyFlags {
    steps
        .iter()
        .fold(flags, |flags, step| step.apply_to(name, flags))
}
