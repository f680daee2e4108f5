//! Live Frame - Columnar data model
//!
//! Frames are the unit of data that flows through the live channel pipeline:
//! converters produce them, processors reshape them, outputters deliver them.
//!
//! - `Frame` - Named, ordered list of fields, all of equal length
//! - `Field` - Named, typed column with optional labels
//! - `Value` - A single scalar cell (number, string, bool, time or null)
//! - `fingerprints_from_frame` - Decode a set of dimension fingerprints
//!
//! # Design Principles
//!
//! - **Value-like**: Frames are cloned into new frames, never mutated behind
//!   a shared reference. Once a field is attached to a frame it is read-only.
//! - **Checked construction**: Every constructor validates types, nullability
//!   and equal field lengths, so downstream stages can rely on the invariant.
//! - **Schema-only frames**: A frame may carry zero rows to signal a schema change.
//!
//! # Example
//!
//! ```
//! use live_frame::{Field, Frame};
//!
//! let frame = Frame::from_fields(
//!     "cpu",
//!     vec![
//!         Field::string("host", vec!["a", "b"]),
//!         Field::float64("value", vec![0.5, 0.7]),
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(frame.row_count(), 2);
//! assert_eq!(frame.field("value").unwrap().latest_f64(), Some(0.7));
//! ```

mod error;
mod field;
mod fingerprint;
mod frame;
mod json;

pub use error::{FrameError, Result};
pub use field::{Field, FieldType, Labels, Value};
pub use fingerprint::{dimension_fingerprint, fingerprint_frame, fingerprints_from_frame};
pub use frame::Frame;
pub use json::parse_json_time;

#[cfg(test)]
mod fingerprint_test;
#[cfg(test)]
mod json_test;
