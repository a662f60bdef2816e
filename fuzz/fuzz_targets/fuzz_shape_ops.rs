#![no_main]

use libfuzzer_sys::fuzz_target;
use shapecache::{PropertyFlags, Runtime, Shape, ShapeConfig};

const NAMES: [&str; 8] = ["a", "b", "c", "d", "0", "1", "length", "x"];

/// Replays byte-coded operations on a pair of objects and checks the shape
/// invariants after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    let rt = Runtime::with_config(ShapeConfig {
        gc_threshold: 1,
        ..ShapeConfig::default()
    });
    let names: Vec<_> = NAMES.iter().map(|n| rt.intern(n)).collect();
    let mut objects: [Shape; 2] = [rt.root_shape(), rt.root_shape()];

    for chunk in data.chunks(3) {
        let [op, arg, which] = [
            chunk[0],
            chunk.get(1).copied().unwrap_or(0),
            chunk.get(2).copied().unwrap_or(0),
        ];
        let slot = usize::from(which & 1);
        let shape = objects[slot].clone();
        let name = names[usize::from(arg) % names.len()];
        let flags = PropertyFlags::from_bits_truncate(arg >> 3) - PropertyFlags::FLAGS_TRANSITION
            - PropertyFlags::INTERNAL;
        let before = shape.borrow().property_count();
        let was_dictionary = shape.borrow().is_dictionary();
        let was_no_cache = shape.borrow().is_dictionary_no_cache();

        let next = match op % 8 {
            0 | 1 => {
                if rt.find_property(&shape, name, None).is_some() {
                    continue;
                }
                let (next, _) = rt.add_property(&shape, name, flags).unwrap();
                assert_eq!(next.borrow().property_count(), before + 1);
                next
            }
            2 => {
                let Some((pos, _)) = rt.find_property(&shape, name, None) else {
                    continue;
                };
                let next = rt.delete_property(&shape, pos).unwrap();
                assert_eq!(next.borrow().property_count(), before - 1);
                assert!(next.borrow().is_dictionary());
                assert!(rt.find_property(&next, name, None).is_none());
                next
            }
            3 => {
                let Some((pos, _)) = rt.find_property(&shape, name, None) else {
                    continue;
                };
                let next = rt.update_property(&shape, pos, flags).unwrap();
                let (_, desc) = rt.find_property(&next, name, None).unwrap();
                assert_eq!(desc.flags, flags);
                next
            }
            4 => {
                let next = rt.make_all_non_configurable(&shape).unwrap();
                assert!(rt.are_all_non_configurable(&next));
                next
            }
            5 => {
                let next = rt.make_all_read_only(&shape).unwrap();
                assert!(rt.are_all_read_only(&next));
                next
            }
            6 => {
                rt.collect_garbage();
                shape
            }
            _ => {
                let next = rt
                    .update_property_flags_without_transitions(
                        &shape,
                        PropertyFlags::empty(),
                        PropertyFlags::ENUMERABLE,
                        None,
                    )
                    .unwrap();
                assert!(next.borrow().is_dictionary());
                next
            }
        };

        let node = next.borrow();
        if was_dictionary {
            assert!(node.is_dictionary());
        }
        if was_no_cache {
            assert!(node.is_dictionary_no_cache());
        }
        if !node.is_dictionary() {
            assert!(node.property_count() <= shapecache::DICTIONARY_THRESHOLD);
            assert!(Runtime::maps_on_chain(&next) <= 1);
        }
        drop(node);

        let mut seen = Vec::new();
        rt.for_each_property_no_alloc(&next, |name, desc| seen.push((name, desc)));
        let mut full = Vec::new();
        rt.for_each_property(&next, |name, desc| full.push((name, desc)));
        assert_eq!(seen, full);
        assert_eq!(full.len(), next.borrow().property_count() as usize);

        objects[slot] = next;
    }
});
