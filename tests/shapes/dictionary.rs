//! Dictionary mode: deletion, in-place edits, no-cache promotion

use super::{add, add_with, build, create_test_runtime, flags_of, names_of};
use shapecache::{PropertyFlags, Shape};

#[test]
fn test_delete_then_add_reuses_slot() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b", "c"]);
    let (pos, desc) = rt.find_property(&shape, rt.intern("b"), None).unwrap();
    assert_eq!(desc.slot, 1);

    let dict = rt.delete_property(&shape, pos).unwrap();
    let (dict, slot) = add_with(&rt, &dict, "d", PropertyFlags::default());
    assert_eq!(slot, 1);
    let (_, slot) = add_with(&rt, &dict, "e", PropertyFlags::default());
    assert_eq!(slot, 3);
}

#[test]
fn test_deletion_order_is_lifo() {
    let rt = create_test_runtime();
    let mut dict = build(&rt, &["a", "b", "c", "d"]);
    for name in ["a", "c"] {
        let (pos, _) = rt.find_property(&dict, rt.intern(name), None).unwrap();
        dict = rt.delete_property(&dict, pos).unwrap();
    }
    let (dict, first) = add_with(&rt, &dict, "x", PropertyFlags::default());
    let (_, second) = add_with(&rt, &dict, "y", PropertyFlags::default());
    assert_eq!((first, second), (2, 0));
}

#[test]
fn test_tree_deletion_gives_cacheable_dictionary() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let (pos, _) = rt.find_property(&shape, rt.intern("a"), None).unwrap();
    let dict = rt.delete_property(&shape, pos).unwrap();
    assert!(dict.borrow().is_dictionary());
    assert!(!dict.borrow().is_dictionary_no_cache());
    assert!(dict.borrow().parent().is_none());

    // The tree node is still shared by other objects and still complete.
    assert_eq!(names_of(&rt, &shape), vec!["a", "b"]);
}

#[test]
fn test_second_deletion_goes_no_cache() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b", "c"]);
    let (pos, _) = rt.find_property(&shape, rt.intern("a"), None).unwrap();
    let dict = rt.delete_property(&shape, pos).unwrap();

    let (pos, _) = rt.find_property(&dict, rt.intern("b"), None).unwrap();
    let no_cache = rt.delete_property(&dict, pos).unwrap();
    assert!(!Shape::ptr_eq(&dict, &no_cache));
    assert!(no_cache.borrow().is_dictionary_no_cache());
    assert_eq!(no_cache.borrow().property_count(), 1);

    // From here on every edit happens in place.
    let (pos, _) = rt.find_property(&no_cache, rt.intern("c"), None).unwrap();
    let same = rt.delete_property(&no_cache, pos).unwrap();
    assert!(Shape::ptr_eq(&same, &no_cache));
    assert_eq!(same.borrow().property_count(), 0);
}

#[test]
fn test_dictionary_flag_update_goes_no_cache_once() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b"]);
    let dict = rt.copy_to_new_dictionary(&shape, false).unwrap();

    let (pos, _) = rt.find_property(&dict, rt.intern("a"), None).unwrap();
    let updated = rt.update_property(&dict, pos, PropertyFlags::ENUMERABLE).unwrap();
    assert!(!Shape::ptr_eq(&updated, &dict));
    assert!(updated.borrow().is_dictionary_no_cache());
    assert_eq!(flags_of(&rt, &updated, "a"), Some(PropertyFlags::ENUMERABLE));

    let (pos, _) = rt.find_property(&updated, rt.intern("b"), None).unwrap();
    let again = rt.update_property(&updated, pos, PropertyFlags::empty()).unwrap();
    assert!(Shape::ptr_eq(&again, &updated));
    assert_eq!(flags_of(&rt, &again, "b"), Some(PropertyFlags::empty()));
}

#[test]
fn test_dictionary_add_keeps_identity_and_cacheability() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a"]);
    let dict = rt.copy_to_new_dictionary(&shape, false).unwrap();
    let grown = add(&rt, &dict, "b");
    assert!(Shape::ptr_eq(&grown, &dict));
    assert!(!grown.borrow().is_dictionary_no_cache());
    assert_eq!(names_of(&rt, &grown), vec!["a", "b"]);
}

#[test]
fn test_update_flags_without_transitions() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a", "b", "c"]);
    let a = rt.intern("a");
    let c = rt.intern("c");

    let dict = rt
        .update_property_flags_without_transitions(
            &shape,
            PropertyFlags::ENUMERABLE,
            PropertyFlags::empty(),
            Some(&[a, c][..]),
        )
        .unwrap();
    assert!(dict.borrow().is_dictionary());
    assert!(shape.borrow().is_known_leaf());
    assert!(!flags_of(&rt, &dict, "a").unwrap().contains(PropertyFlags::ENUMERABLE));
    assert!(flags_of(&rt, &dict, "b").unwrap().contains(PropertyFlags::ENUMERABLE));
    assert!(!flags_of(&rt, &dict, "c").unwrap().contains(PropertyFlags::ENUMERABLE));

    // Applying to a cacheable dictionary moves it to no-cache, after that the
    // node is edited in place.
    let no_cache = rt
        .update_property_flags_without_transitions(
            &dict,
            PropertyFlags::WRITABLE,
            PropertyFlags::empty(),
            None,
        )
        .unwrap();
    assert!(no_cache.borrow().is_dictionary_no_cache());
    let same = rt
        .update_property_flags_without_transitions(
            &no_cache,
            PropertyFlags::empty(),
            PropertyFlags::WRITABLE,
            None,
        )
        .unwrap();
    assert!(Shape::ptr_eq(&same, &no_cache));
    assert!(flags_of(&rt, &same, "b").unwrap().contains(PropertyFlags::WRITABLE));
}

#[test]
fn test_empty_dictionary_copy() {
    let rt = create_test_runtime();
    let dict = rt.copy_to_new_dictionary(&rt.root_shape(), false).unwrap();
    assert!(dict.borrow().is_dictionary());
    assert_eq!(dict.borrow().property_count(), 0);
    let (grown, slot) = add_with(&rt, &dict, "a", PropertyFlags::default());
    assert_eq!(slot, 0);
    assert!(Shape::ptr_eq(&grown, &dict));
}

#[test]
fn test_dictionary_keeps_index_like_flag() {
    let rt = create_test_runtime();
    let shape = build(&rt, &["a"]);
    let dict = rt.copy_to_new_dictionary(&shape, false).unwrap();
    assert!(!dict.borrow().has_index_like_properties());
    let dict = add(&rt, &dict, "3");
    assert!(dict.borrow().has_index_like_properties());
}
