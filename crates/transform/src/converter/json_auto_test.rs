//! Tests for the jsonAuto converter

use std::collections::BTreeMap;

use live_config::{ConverterConfig, FieldTip, JsonAutoConfig};
use live_frame::{FieldType, Value};

use super::{Converter, JsonAutoConverter};

fn convert(payload: &str) -> live_frame::Frame {
    let converter = JsonAutoConverter::default();
    let mut frames = converter.convert("stream/test/metrics", payload.as_bytes()).unwrap();
    assert_eq!(frames.len(), 1);
    frames.remove(0)
}

#[test]
fn test_object_becomes_one_row() {
    let frame = convert(r#"{"value": 1.5, "host": "a", "up": true}"#);
    assert_eq!(frame.name(), "metrics");
    assert_eq!(frame.row_count(), 1);
    assert_eq!(frame.field("value").unwrap().field_type(), FieldType::Float64);
    assert_eq!(frame.field("host").unwrap().field_type(), FieldType::String);
    assert_eq!(frame.field("up").unwrap().field_type(), FieldType::Bool);
    assert!(!frame.field("value").unwrap().nullable());
}

#[test]
fn test_time_field_added() {
    let frame = convert(r#"{"value": 1}"#);
    let time = frame.field("time").unwrap();
    assert_eq!(time.field_type(), FieldType::Time);
    assert_eq!(frame.fields()[0].name(), "time");
}

#[test]
fn test_existing_time_field_kept() {
    let frame = convert(r#"{"time": "now-ish", "value": 1}"#);
    assert_eq!(frame.fields_named("time").count(), 1);
    assert_eq!(frame.field("time").unwrap().field_type(), FieldType::String);
}

#[test]
fn test_nested_objects_flattened() {
    let frame = convert(r#"{"a": {"b": {"c": 3}}, "d": 4}"#);
    assert_eq!(frame.field("a.b.c").unwrap().latest_f64(), Some(3.0));
    assert!(frame.field("a").is_none());
}

#[test]
fn test_array_of_objects_becomes_rows() {
    let frame = convert(r#"[{"v": 1, "x": "a"}, {"v": 2}, {"v": 3, "y": true}]"#);
    assert_eq!(frame.row_count(), 3);

    let x = frame.field("x").unwrap();
    assert!(x.nullable());
    assert_eq!(x.values(), &[Value::String("a".into()), Value::Null, Value::Null]);

    let y = frame.field("y").unwrap();
    assert_eq!(y.values(), &[Value::Null, Value::Null, Value::Bool(true)]);
    assert_eq!(frame.field("v").unwrap().latest_f64(), Some(3.0));
}

#[test]
fn test_irregular_shapes_degrade_to_string() {
    let frame = convert(r#"[{"v": 1}, {"v": "high"}, {"v": [1, 2]}]"#);
    let v = frame.field("v").unwrap();
    assert_eq!(v.field_type(), FieldType::String);
    assert_eq!(
        v.values(),
        &[
            Value::String("1".into()),
            Value::String("high".into()),
            Value::String("[1,2]".into()),
        ]
    );
}

#[test]
fn test_scalar_payload() {
    let frame = convert("42");
    assert_eq!(frame.field("value").unwrap().latest_f64(), Some(42.0));
}

#[test]
fn test_empty_array_is_schema_only() {
    let frame = convert("[]");
    assert!(frame.is_empty());
}

#[test]
fn test_invalid_json_fails() {
    let converter = JsonAutoConverter::default();
    assert!(converter.convert("stream/a/b", b"{oops").is_err());
}

#[test]
fn test_field_tips_force_type() {
    let mut tips = BTreeMap::new();
    tips.insert(
        "count".to_string(),
        FieldTip {
            field_type: FieldType::Int64,
        },
    );
    let config = ConverterConfig {
        json_auto: Some(JsonAutoConfig { field_tips: tips }),
        ..ConverterConfig::of_type("jsonAuto")
    };
    let converter = JsonAutoConverter::from_config(&config).unwrap();
    let frames = converter
        .convert("stream/a/b", br#"[{"count": 3}, {"count": "many"}]"#)
        .unwrap();

    let count = frames[0].field("count").unwrap();
    assert_eq!(count.field_type(), FieldType::Int64);
    assert_eq!(count.values(), &[Value::Int64(3), Value::Null]);
}
