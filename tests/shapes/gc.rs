//! Collection, weak transitions and memory release

use super::{add, build, create_test_runtime, create_test_runtime_with, flags_of, names_of};
use shapecache::{PropertyFlags, Runtime, ShapeConfig, ShapeError};

#[test]
fn test_dead_child_is_recreated() {
    let rt = create_test_runtime();
    let base = build(&rt, &["a"]);
    let (first_id, first_generation) = {
        let child = add(&rt, &base, "b");
        (child.id(), child.generation())
    };
    rt.collect_garbage();
    assert_eq!(base.borrow().transitions().live_len(), 0);
    assert!(!base.borrow().is_known_leaf());

    let again = add(&rt, &base, "b");
    assert_eq!(again.borrow().property_count(), 2);
    assert!(again.id() != first_id || again.generation() != first_generation);
    assert_eq!(base.borrow().transitions().live_len(), 1);
    assert_eq!(names_of(&rt, &again), vec!["a", "b"]);
}

#[test]
fn test_children_keep_parents_alive() {
    let rt = create_test_runtime();
    let leaf = build(&rt, &["a", "b", "c"]);
    rt.collect_garbage();
    assert_eq!(names_of(&rt, &leaf), vec!["a", "b", "c"]);
    // root + a + b + c
    assert_eq!(rt.gc_stats().live_objects, 4);

    drop(leaf);
    rt.collect_garbage();
    assert_eq!(rt.gc_stats().live_objects, 1);
}

#[test]
fn test_maps_released_and_rebuilt() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b", "c"]);
    assert!(flags_of(&rt, &shape, "b").is_some());
    assert!(shape.borrow().has_property_map());

    rt.collect_garbage();
    assert!(!shape.borrow().has_property_map());
    assert_eq!(flags_of(&rt, &shape, "b"), Some(PropertyFlags::default()));
    assert!(shape.borrow().has_property_map());
}

#[test]
fn test_dictionary_maps_survive_collection() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let (pos, _) = rt.find_property(&shape, rt.intern("a"), None).unwrap();
    let dict = rt.delete_property(&shape, pos).unwrap();
    rt.collect_garbage();
    assert!(dict.borrow().has_property_map());
    assert_eq!(names_of(&rt, &dict), vec!["b"]);
}

#[test]
fn test_map_release_can_be_disabled() {
    let rt = create_test_runtime_with(ShapeConfig {
        release_property_maps: false,
        ..ShapeConfig::default()
    });
    let shape = build(&rt, &["a"]);
    assert!(flags_of(&rt, &shape, "a").is_some());
    rt.collect_garbage();
    assert!(shape.borrow().has_property_map());
}

#[test]
fn test_single_map_per_chain() {
    let rt = create_test_runtime();
    let ab = build(&rt, &["a", "b"]);
    let abc = add(&rt, &ab, "c");
    let abd = add(&rt, &ab, "d");

    assert!(flags_of(&rt, &abc, "a").is_some());
    assert_eq!(Runtime::maps_on_chain(&abc), 1);
    assert!(flags_of(&rt, &ab, "a").is_some());
    assert_eq!(Runtime::maps_on_chain(&abc), 1);
    assert_eq!(Runtime::maps_on_chain(&ab), 1);

    // Stealing from `ab` leaves nothing behind on it.
    assert!(flags_of(&rt, &abd, "d").is_some());
    assert!(!ab.borrow().has_property_map());
    assert_eq!(Runtime::maps_on_chain(&abd), 1);
    assert_eq!(Runtime::maps_on_chain(&abc), 0);
}

#[test]
fn test_heap_limit_reports_out_of_memory() {
    let rt = create_test_runtime_with(ShapeConfig {
        max_heap_objects: Some(3),
        ..ShapeConfig::default()
    });
    let ab = build(&rt, &["a", "b"]);
    let err = rt
        .add_property(&ab, rt.intern("c"), PropertyFlags::default())
        .unwrap_err();
    assert!(matches!(err, ShapeError::OutOfMemory(_)));
    assert_eq!(ab.borrow().property_count(), 2);
    assert!(ab.borrow().is_known_leaf());

    // Releasing a node makes room again.
    drop(ab);
    let fresh = build(&rt, &["x", "y"]);
    assert_eq!(fresh.borrow().property_count(), 2);
}

#[test]
fn test_slot_limit() {
    let rt = create_test_runtime_with(ShapeConfig {
        max_property_slots: 2,
        ..ShapeConfig::default()
    });
    let ab = build(&rt, &["a", "b"]);
    let err = rt
        .add_property(&ab, rt.intern("c"), PropertyFlags::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ShapeError::SlotLimitExceeded {
            requested: 3,
            max: 2
        }
    ));
    assert!(ab.borrow().is_known_leaf());
}

#[test]
fn test_stats_track_modes() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let (pos, _) = rt.find_property(&shape, rt.intern("a"), None).unwrap();
    let dict = rt.delete_property(&shape, pos).unwrap();
    let (pos, _) = rt.find_property(&dict, rt.intern("b"), None).unwrap();
    let no_cache = rt.delete_property(&dict, pos).unwrap();
    drop(dict);

    let stats = rt.shape_stats();
    assert_eq!(stats.nodes, 4);
    assert_eq!(stats.dictionaries, 1);
    assert_eq!(stats.no_cache_dictionaries, 1);
    assert!(no_cache.borrow().memory_size() > 0);
}
