//! Batch flag changes and the cached "all" bits

use super::{add_with, build, create_test_runtime, flags_of};
use shapecache::{ClassFlags, PropertyFlags, Shape};

#[test]
fn test_make_all_read_only_in_tree_mode() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let frozen = rt.make_all_read_only(&shape).unwrap();
    assert!(!Shape::ptr_eq(&frozen, &shape));
    assert!(!frozen.borrow().is_dictionary());
    assert_eq!(frozen.borrow().property_count(), 2);

    for name in ["a", "b"] {
        let flags = flags_of(&rt, &frozen, name).unwrap();
        assert!(flags.is_read_only());
        assert!(flags.contains(PropertyFlags::ENUMERABLE));
    }
    assert!(
        frozen
            .borrow()
            .class_flags()
            .contains(ClassFlags::ALL_READ_ONLY | ClassFlags::ALL_NON_CONFIGURABLE)
    );

    // Idempotent, and independent objects converge.
    let again = rt.make_all_read_only(&frozen).unwrap();
    assert!(Shape::ptr_eq(&again, &frozen));
    let other = rt.make_all_read_only(&build(&rt, &["a", "b"])).unwrap();
    assert!(Shape::ptr_eq(&other, &frozen));
}

#[test]
fn test_make_all_non_configurable_keeps_writable() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a"]);
    let sealed = rt.make_all_non_configurable(&shape).unwrap();
    let flags = flags_of(&rt, &sealed, "a").unwrap();
    assert!(!flags.contains(PropertyFlags::CONFIGURABLE));
    assert!(flags.contains(PropertyFlags::WRITABLE));
    assert!(rt.are_all_non_configurable(&sealed));
    assert!(!rt.are_all_read_only(&sealed));
}

#[test]
fn test_freeze_leaves_accessors_writable_bit() {
    let rt = create_test_runtime();
    let root = rt.root_shape();
    let accessor = PropertyFlags::ACCESSOR | PropertyFlags::CONFIGURABLE | PropertyFlags::WRITABLE;
    let (shape, _) = add_with(&rt, &root, "getter", accessor);
    let frozen = rt.make_all_read_only(&shape).unwrap();
    let flags = flags_of(&rt, &frozen, "getter").unwrap();
    assert!(flags.contains(PropertyFlags::ACCESSOR | PropertyFlags::WRITABLE));
    assert!(!flags.contains(PropertyFlags::CONFIGURABLE));
    assert!(rt.are_all_read_only(&frozen));
}

#[test]
fn test_batch_on_already_frozen_properties_keeps_shape() {
    let rt = create_test_runtime();
    let root = rt.root_shape();
    let (shape, _) = add_with(&rt, &root, "k", PropertyFlags::ENUMERABLE);
    assert!(!shape.borrow().class_flags().contains(ClassFlags::ALL_READ_ONLY));
    let same = rt.make_all_read_only(&shape).unwrap();
    assert!(Shape::ptr_eq(&same, &shape));
    assert!(shape.borrow().class_flags().contains(ClassFlags::ALL_READ_ONLY));
}

#[test]
fn test_all_bits_are_lazily_cached() {
    let rt = create_test_runtime();
    let root = rt.root_shape();
    let (shape, _) = add_with(&rt, &root, "k", PropertyFlags::WRITABLE);
    assert!(!shape.borrow().class_flags().contains(ClassFlags::ALL_NON_CONFIGURABLE));
    assert!(rt.are_all_non_configurable(&shape));
    assert!(shape.borrow().class_flags().contains(ClassFlags::ALL_NON_CONFIGURABLE));
    assert!(!rt.are_all_read_only(&shape));
}

#[test]
fn test_adding_after_freeze_narrows_bits() {
    let rt = create_test_runtime();
    let frozen = rt.make_all_read_only(&build(&rt, &["a"])).unwrap();
    let (grown, _) = add_with(&rt, &frozen, "b", PropertyFlags::default());
    assert!(!grown.borrow().class_flags().contains(ClassFlags::ALL_NON_CONFIGURABLE));
    assert!(!rt.are_all_non_configurable(&grown));

    // The earlier property stays frozen on the grown shape.
    assert!(flags_of(&rt, &grown, "a").unwrap().is_read_only());
    assert!(!flags_of(&rt, &grown, "b").unwrap().is_read_only());
}

#[test]
fn test_batch_on_dictionary() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let dict = rt.copy_to_new_dictionary(&shape, false).unwrap();

    let frozen = rt.make_all_read_only(&dict).unwrap();
    assert!(frozen.borrow().is_dictionary_no_cache());
    assert!(rt.are_all_read_only(&frozen));

    let sealed_again = rt.make_all_non_configurable(&frozen).unwrap();
    assert!(Shape::ptr_eq(&sealed_again, &frozen));
}

#[test]
fn test_no_alloc_lookup_sees_batch_and_updates() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let (pos, _) = rt.find_property(&shape, rt.intern("a"), None).unwrap();
    let updated = rt
        .update_property(&shape, pos, PropertyFlags::ENUMERABLE | PropertyFlags::CONFIGURABLE)
        .unwrap();
    let sealed = rt.make_all_non_configurable(&updated).unwrap();
    let grown = super::add(&rt, &sealed, "c");

    // Drop every map so the lookup has to walk the chain.
    rt.collect_garbage();
    assert_eq!(shapecache::Runtime::maps_on_chain(&grown), 0);

    let a = rt.find_property_no_alloc(&grown, rt.intern("a")).unwrap();
    assert_eq!(a.flags, PropertyFlags::ENUMERABLE);
    assert_eq!(a.slot, 0);
    let b = rt.find_property_no_alloc(&grown, rt.intern("b")).unwrap();
    assert_eq!(b.flags, PropertyFlags::WRITABLE | PropertyFlags::ENUMERABLE);
    let c = rt.find_property_no_alloc(&grown, rt.intern("c")).unwrap();
    assert_eq!(c.flags, PropertyFlags::default());
    assert_eq!(c.slot, 2);
    assert!(rt.find_property_no_alloc(&grown, rt.intern("zzz")).is_none());
    assert_eq!(shapecache::Runtime::maps_on_chain(&grown), 0);

    // And the materialized answer agrees.
    assert_eq!(rt.find_property(&grown, rt.intern("a"), None).unwrap().1, a);
}
