//! Frame error types

use thiserror::Error;

use crate::FieldType;

/// Result type for frame operations
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors that can occur when building, decoding or inspecting frames
#[derive(Debug, Error)]
pub enum FrameError {
    /// A field's length differs from the other fields in the frame
    #[error("field '{field}' has {actual} values, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// A value does not match the declared field type
    #[error("field '{field}' expects {expected} values, got {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: String,
    },

    /// A null was written to a non-nullable field
    #[error("field '{field}' is not nullable")]
    NullNotAllowed { field: String },

    /// Malformed frame document
    #[error("invalid frame document: {0}")]
    Decode(String),

    /// JSON (de)serialization failed
    #[error("frame json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is not a valid fingerprint frame
    #[error("invalid fingerprint frame: {0}")]
    Fingerprint(String),
}

impl FrameError {
    /// Create a length mismatch error
    #[inline]
    pub fn length_mismatch(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Create a type mismatch error
    #[inline]
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: FieldType,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            actual: actual.into(),
        }
    }

    /// Create a null-not-allowed error
    #[inline]
    pub fn null_not_allowed(field: impl Into<String>) -> Self {
        Self::NullNotAllowed {
            field: field.into(),
        }
    }

    /// Create a decode error
    #[inline]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a fingerprint error
    #[inline]
    pub fn fingerprint(msg: impl Into<String>) -> Self {
        Self::Fingerprint(msg.into())
    }
}
