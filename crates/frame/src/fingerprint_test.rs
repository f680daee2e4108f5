//! Tests for dimension fingerprints

use std::collections::HashSet;

use crate::{
    Field, Frame, FrameError, Labels, dimension_fingerprint, fingerprint_frame,
    fingerprints_from_frame,
};

#[test]
fn test_fingerprints_from_uint64_frame() {
    let frame = Frame::from_field("fp", Field::uint64("fp", vec![1, 2, 3, 4, 5]));
    let set = fingerprints_from_frame(&frame).unwrap();
    assert_eq!(set, HashSet::from([1, 2, 3, 4, 5]));
}

#[test]
fn test_fingerprints_from_frame_without_fields() {
    let frame = Frame::new("fp");
    assert!(matches!(
        fingerprints_from_frame(&frame),
        Err(FrameError::Fingerprint(_))
    ));
}

#[test]
fn test_fingerprints_from_frame_with_two_fields() {
    let frame = Frame::from_fields(
        "fp",
        vec![Field::uint64("a", vec![1]), Field::uint64("b", vec![2])],
    )
    .unwrap();
    assert!(fingerprints_from_frame(&frame).is_err());
}

#[test]
fn test_fingerprints_from_non_uint64_field() {
    let frame = Frame::from_field("fp", Field::int64("a", vec![1, 2]));
    assert!(fingerprints_from_frame(&frame).is_err());
}

#[test]
fn test_fingerprints_from_nullable_uint64_field() {
    let frame = Frame::from_field("fp", Field::nullable_uint64("a", vec![Some(1), Some(2)]));
    assert!(fingerprints_from_frame(&frame).is_err());
}

#[test]
fn test_fingerprint_frame_reads_back() {
    let set = HashSet::from([9, 3, 7]);
    let frame = fingerprint_frame("loaded", &set);
    assert_eq!(frame.name(), "loaded");
    assert_eq!(fingerprints_from_frame(&frame).unwrap(), set);
}

#[test]
fn test_dimension_fingerprint_depends_on_labels() {
    let mut a = Labels::new();
    a.insert("host".into(), "a".into());
    let mut b = Labels::new();
    b.insert("host".into(), "b".into());

    assert_eq!(dimension_fingerprint("cpu", &a), dimension_fingerprint("cpu", &a));
    assert_ne!(dimension_fingerprint("cpu", &a), dimension_fingerprint("cpu", &b));
    assert_ne!(dimension_fingerprint("cpu", &a), dimension_fingerprint("mem", &a));
}

#[test]
fn test_dimension_fingerprint_separates_key_value_boundaries() {
    let mut a = Labels::new();
    a.insert("ab".into(), "c".into());
    let mut b = Labels::new();
    b.insert("a".into(), "bc".into());
    assert_ne!(dimension_fingerprint("x", &a), dimension_fingerprint("x", &b));
}
