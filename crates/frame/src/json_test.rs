//! Tests for JSON frame documents

use chrono::{TimeZone, Utc};

use crate::{Field, FieldType, Frame, FrameError, Labels, Value};

#[test]
fn test_encode_and_decode_preserves_frame() {
    let mut labels = Labels::new();
    labels.insert("host".into(), "a".into());
    let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let frame = Frame::from_fields(
        "cpu",
        vec![
            Field::time("time", vec![t]),
            Field::nullable_float64("value", vec![Some(0.5)]).with_labels(labels),
            Field::bool("ok", vec![true]),
        ],
    )
    .unwrap();

    let bytes = frame.to_json_bytes().unwrap();
    let decoded = Frame::from_json_slice(&bytes).unwrap();
    assert_eq!(decoded, frame);
}

#[test]
fn test_decode_accepts_epoch_millis_for_time() {
    let doc = r#"{"name":"t","fields":[{"name":"time","type":"time","values":[1700000000000]}]}"#;
    let frame = Frame::from_json_slice(doc.as_bytes()).unwrap();
    let expected = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    assert_eq!(frame.fields()[0].get(0), Some(&Value::Time(expected)));
}

#[test]
fn test_decode_type_mismatch_names_field() {
    let doc = r#"{"fields":[{"name":"value","type":"float64","values":["high"]}]}"#;
    let err = Frame::from_json_slice(doc.as_bytes()).unwrap_err();
    match err {
        FrameError::TypeMismatch { field, expected, .. } => {
            assert_eq!(field, "value");
            assert_eq!(expected, FieldType::Float64);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_length_mismatch() {
    let doc = r#"{"fields":[
        {"name":"a","type":"int64","values":[1,2]},
        {"name":"b","type":"int64","values":[1]}
    ]}"#;
    assert!(matches!(
        Frame::from_json_slice(doc.as_bytes()),
        Err(FrameError::LengthMismatch { .. })
    ));
}

#[test]
fn test_decode_null_in_non_nullable_field() {
    let doc = r#"{"fields":[{"name":"a","type":"string","values":[null]}]}"#;
    assert!(matches!(
        Frame::from_json_slice(doc.as_bytes()),
        Err(FrameError::NullNotAllowed { .. })
    ));
}

#[test]
fn test_decode_rejects_unknown_keys() {
    let doc = r#"{"fields":[], "extra": true}"#;
    assert!(matches!(
        Frame::from_json_slice(doc.as_bytes()),
        Err(FrameError::Json(_))
    ));
}

#[test]
fn test_nan_encodes_as_null() {
    let frame = Frame::from_field("n", Field::nullable_float64("v", vec![Some(f64::NAN)]));
    let json = frame.to_json();
    assert!(json["fields"][0]["values"][0].is_null());
}
