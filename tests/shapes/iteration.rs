//! Property iteration and the lookup variants that avoid building maps

use super::{add, add_with, build, create_test_runtime, names_of};
use shapecache::{FastLookup, PropertyFlags, Runtime};

#[test]
fn test_iteration_in_insertion_order() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["z", "a", "m"]);
    assert_eq!(names_of(&rt, &shape), vec!["z", "a", "m"]);
}

#[test]
fn test_for_each_property_while_stops_early() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b", "c"]);
    let mut visited = 0;
    let complete = rt.for_each_property_while(&shape, |_, _| {
        visited += 1;
        visited < 2
    });
    assert!(!complete);
    assert_eq!(visited, 2);
}

#[test]
fn test_no_alloc_iteration_matches_full() {
    let rt = create_test_runtime();
    let base = build(&rt, &["a", "b"]);
    // Give `base` a map, then move it one step down.
    assert_eq!(names_of(&rt, &base).len(), 2);
    let mid = add(&rt, &base, "c");
    let (leaf, _) = add_with(&rt, &mid, "d", PropertyFlags::ENUMERABLE);
    let leaf = rt.make_all_non_configurable(&leaf).unwrap();
    let leaf = add(&rt, &leaf, "e");
    assert!(mid.borrow().has_property_map() || leaf.borrow().has_property_map());

    let mut walked = Vec::new();
    rt.for_each_property_no_alloc(&leaf, |name, desc| walked.push((name, desc)));

    let mut full = Vec::new();
    rt.for_each_property(&leaf, |name, desc| full.push((name, desc)));
    assert_eq!(walked, full);
    assert_eq!(full.len(), 5);
}

#[test]
fn test_no_alloc_iteration_without_any_map() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b", "c"]);
    rt.collect_garbage();
    assert_eq!(Runtime::maps_on_chain(&shape), 0);

    let mut names = Vec::new();
    rt.for_each_property_no_alloc(&shape, |name, desc| names.push((name, desc.slot)));
    assert_eq!(
        names,
        vec![(rt.intern("a"), 0), (rt.intern("b"), 1), (rt.intern("c"), 2)]
    );
    assert_eq!(Runtime::maps_on_chain(&shape), 0);
}

#[test]
fn test_try_find_property_fast() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a"]);
    let a = rt.intern("a");
    let missing = rt.intern("missing");

    rt.collect_garbage();
    assert_eq!(rt.try_find_property_fast(&shape, a), FastLookup::Unknown);
    assert_eq!(
        rt.try_find_property_fast(&rt.root_shape(), a),
        FastLookup::Missing
    );

    assert!(rt.find_property(&shape, a, None).is_some());
    assert!(matches!(
        rt.try_find_property_fast(&shape, a),
        FastLookup::Found(_, desc) if desc.slot == 0
    ));
    assert_eq!(rt.try_find_property_fast(&shape, missing), FastLookup::Missing);
}

#[test]
fn test_debug_is_property_defined() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    rt.collect_garbage();
    assert!(rt.debug_is_property_defined(&shape, rt.intern("a")));
    assert!(!rt.debug_is_property_defined(&shape, rt.intern("c")));
    assert!(!shape.borrow().has_property_map());
}

#[test]
fn test_snapshot_names() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a"]);
    assert_eq!(shape.borrow().snapshot_name(), "ShapeNode");
    let dict = rt.copy_to_new_dictionary(&shape, false).unwrap();
    assert_eq!(dict.borrow().snapshot_name(), "ShapeNode(Dictionary)");
}
