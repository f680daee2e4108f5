//! Dimension fingerprints
//!
//! A dimension is one series: a field name plus its label set. Stateful
//! outputters remember which dimensions are in a given state by storing a
//! fingerprint frame: exactly one non-nullable `uint64` field.

use std::collections::HashSet;

use xxhash_rust::xxh3::Xxh3;

use crate::error::{FrameError, Result};
use crate::field::{Field, FieldType, Labels, Value};
use crate::frame::Frame;

/// Name of the single field in a fingerprint frame
const FINGERPRINT_FIELD: &str = "fingerprint";

/// Stable fingerprint of a field name and its labels
pub fn dimension_fingerprint(name: &str, labels: &Labels) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(name.as_bytes());
    for (key, value) in labels {
        // Separators keep ("ab","c") and ("a","bc") apart.
        hasher.update(&[0xff]);
        hasher.update(key.as_bytes());
        hasher.update(&[0xfe]);
        hasher.update(value.as_bytes());
    }
    hasher.digest()
}

/// Extract the set of fingerprints stored in a fingerprint frame
///
/// # Errors
///
/// The frame must contain exactly one field of non-nullable `uint64` values.
/// Zero fields, several fields, another type or a nullable field are errors.
pub fn fingerprints_from_frame(frame: &Frame) -> Result<HashSet<u64>> {
    let fields = frame.fields();
    if fields.len() != 1 {
        return Err(FrameError::fingerprint(format!(
            "expected exactly one field, got {}",
            fields.len()
        )));
    }

    let field = &fields[0];
    if field.field_type() != FieldType::Uint64 {
        return Err(FrameError::fingerprint(format!(
            "expected a uint64 field, got {}",
            field.field_type()
        )));
    }
    if field.nullable() {
        return Err(FrameError::fingerprint(
            "expected a non-nullable uint64 field, got a nullable one",
        ));
    }

    let mut set = HashSet::with_capacity(field.len());
    for value in field.values() {
        match value {
            Value::Uint64(v) => {
                set.insert(*v);
            }
            other => {
                return Err(FrameError::fingerprint(format!(
                    "unexpected {} value",
                    other.type_name()
                )));
            }
        }
    }
    Ok(set)
}

/// Build a fingerprint frame from a set (values sorted for stable output)
pub fn fingerprint_frame(name: impl Into<String>, fingerprints: &HashSet<u64>) -> Frame {
    let mut values: Vec<u64> = fingerprints.iter().copied().collect();
    values.sort_unstable();
    Frame::from_field(name, Field::uint64(FINGERPRINT_FIELD, values))
}
