//! Tests for processors

use live_config::{ProcessorConfig, MAX_NESTING_DEPTH};
use live_frame::{Field, Frame};

use super::*;

fn sample_frame() -> Frame {
    Frame::from_fields(
        "cpu",
        vec![
            Field::string("host", vec!["a"]),
            Field::float64("value", vec![1.0]),
            Field::int64("cores", vec![4]),
        ],
    )
    .unwrap()
}

fn field_names(frame: &Frame) -> Vec<&str> {
    frame.fields().iter().map(|f| f.name()).collect()
}

// =============================================================================
// dropFields / keepFields
// =============================================================================

#[test]
fn test_drop_fields() {
    let out = DropFieldsProcessor::new(["host", "cores"])
        .process(sample_frame())
        .unwrap();
    assert_eq!(field_names(&out), vec!["value"]);
    assert_eq!(out.name(), "cpu");
}

#[test]
fn test_drop_missing_field_is_noop() {
    let frame = sample_frame();
    let out = DropFieldsProcessor::new(["nope"]).process(frame.clone()).unwrap();
    assert_eq!(out, frame);
}

#[test]
fn test_keep_fields_preserves_frame_order() {
    let out = KeepFieldsProcessor::new(["cores", "host", "missing"])
        .process(sample_frame())
        .unwrap();
    assert_eq!(field_names(&out), vec!["host", "cores"]);
}

#[test]
fn test_drop_then_keep_equals_keep() {
    let frame = sample_frame();
    let keep = KeepFieldsProcessor::new(["value", "cores"]);

    let dropped = DropFieldsProcessor::new(["host"]).process(frame.clone()).unwrap();
    let both = keep.process(dropped).unwrap();
    let kept = keep.process(frame).unwrap();

    assert_eq!(both, kept);
    assert_eq!(field_names(&both), vec!["value", "cores"]);
}

#[test]
fn test_zero_field_frame_unchanged() {
    let empty = Frame::new("schema");
    assert_eq!(
        DropFieldsProcessor::new(["a"]).process(empty.clone()).unwrap(),
        empty
    );
    assert_eq!(
        KeepFieldsProcessor::new(["a"]).process(empty.clone()).unwrap(),
        empty
    );
}

// =============================================================================
// Registry and multiple
// =============================================================================

#[test]
fn test_build_from_config() {
    let registry = default_processor_registry();
    let processor = registry
        .build(&ProcessorConfig::drop_fields(["host"]))
        .unwrap();
    assert_eq!(processor.type_name(), "dropFields");
    let out = processor.process(sample_frame()).unwrap();
    assert_eq!(field_names(&out), vec!["value", "cores"]);
}

#[test]
fn test_multiple_applies_children_in_order() {
    let registry = default_processor_registry();
    let config = ProcessorConfig::multiple(vec![
        ProcessorConfig::keep_fields(["host", "value"]),
        ProcessorConfig::multiple(vec![ProcessorConfig::drop_fields(["host"])]),
    ]);
    let processor = registry.build(&config).unwrap();
    let out = processor.process(sample_frame()).unwrap();
    assert_eq!(field_names(&out), vec!["value"]);
}

#[test]
fn test_empty_multiple_is_identity() {
    let registry = default_processor_registry();
    let processor = registry.build(&ProcessorConfig::multiple(vec![])).unwrap();
    let frame = sample_frame();
    assert_eq!(processor.process(frame.clone()).unwrap(), frame);
}

#[test]
fn test_build_chain() {
    let registry = default_processor_registry();
    let chain = registry
        .build_chain(&[
            ProcessorConfig::drop_fields(["cores"]),
            ProcessorConfig::keep_fields(["value"]),
        ])
        .unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(field_names(&chain.apply(sample_frame()).unwrap()), vec!["value"]);
}

#[test]
fn test_unknown_type_names_it() {
    let registry = default_processor_registry();
    let err = registry
        .build(&ProcessorConfig::of_type("bogus"))
        .err()
        .unwrap();
    assert!(err.to_string().contains("bogus"));

    let nested = ProcessorConfig::multiple(vec![ProcessorConfig::of_type("bogus")]);
    let err = registry.build(&nested).err().unwrap();
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn test_missing_settings() {
    let registry = default_processor_registry();
    let err = registry
        .build(&ProcessorConfig::of_type("keepFields"))
        .err()
        .unwrap();
    assert!(matches!(err, TransformError::MissingSettings { .. }));
}

#[test]
fn test_nesting_limit() {
    let mut config = ProcessorConfig::drop_fields(["x"]);
    for _ in 0..MAX_NESTING_DEPTH {
        config = ProcessorConfig::multiple(vec![config]);
    }
    let err = default_processor_registry().build(&config).err().unwrap();
    assert!(matches!(err, TransformError::TooDeep { .. }));
}
