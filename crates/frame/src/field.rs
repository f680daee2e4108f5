//! Field types
//!
//! A `Field` is a single typed column. All values in a field share one
//! `FieldType`; nulls are only accepted by nullable fields.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Field labels (dimension key/value pairs), sorted by key
pub type Labels = BTreeMap<String, String>;

/// Scalar type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit float
    Float64,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    Uint64,
    /// UTF-8 string
    String,
    /// Boolean
    Bool,
    /// UTC timestamp
    Time,
}

impl FieldType {
    /// Type name as used in frame documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float64 => "float64",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Time => "time",
        }
    }

    /// Whether values of this type can be compared numerically
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Float64 | Self::Int64 | Self::Uint64)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Float64(f64),
    Int64(i64),
    Uint64(u64),
    String(String),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl Value {
    /// The field type this value belongs to, `None` for null
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Null => None,
            Self::Float64(_) => Some(FieldType::Float64),
            Self::Int64(_) => Some(FieldType::Int64),
            Self::Uint64(_) => Some(FieldType::Uint64),
            Self::String(_) => Some(FieldType::String),
            Self::Bool(_) => Some(FieldType::Bool),
            Self::Time(_) => Some(FieldType::Time),
        }
    }

    /// Whether this is a null value
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value (numbers only)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            Self::Int64(v) => Some(*v as f64),
            Self::Uint64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.field_type().map_or("null", |t| t.as_str())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Time(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    labels: Labels,
    field_type: FieldType,
    nullable: bool,
    values: Vec<Value>,
}

impl Field {
    /// Create an empty field
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            field_type,
            nullable,
            values: Vec::new(),
        }
    }

    /// Create a field from values, checking every value against the type
    pub fn from_values(
        name: impl Into<String>,
        field_type: FieldType,
        nullable: bool,
        values: Vec<Value>,
    ) -> Result<Self> {
        let mut field = Self::new(name, field_type, nullable);
        field.values.reserve(values.len());
        for value in values {
            field.push(value)?;
        }
        Ok(field)
    }

    /// Non-nullable float64 field
    pub fn float64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::unchecked(name, FieldType::Float64, false, values.into_iter().map(Value::Float64))
    }

    /// Nullable float64 field
    pub fn nullable_float64(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::unchecked(name, FieldType::Float64, true, values.into_iter().map(Value::from))
    }

    /// Non-nullable int64 field
    pub fn int64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::unchecked(name, FieldType::Int64, false, values.into_iter().map(Value::Int64))
    }

    /// Non-nullable uint64 field
    pub fn uint64(name: impl Into<String>, values: Vec<u64>) -> Self {
        Self::unchecked(name, FieldType::Uint64, false, values.into_iter().map(Value::Uint64))
    }

    /// Nullable uint64 field
    pub fn nullable_uint64(name: impl Into<String>, values: Vec<Option<u64>>) -> Self {
        Self::unchecked(name, FieldType::Uint64, true, values.into_iter().map(Value::from))
    }

    /// Non-nullable string field
    pub fn string<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::unchecked(
            name,
            FieldType::String,
            false,
            values.into_iter().map(|v| Value::String(v.into())),
        )
    }

    /// Nullable string field
    pub fn nullable_string(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::unchecked(name, FieldType::String, true, values.into_iter().map(Value::from))
    }

    /// Non-nullable bool field
    pub fn bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::unchecked(name, FieldType::Bool, false, values.into_iter().map(Value::Bool))
    }

    /// Non-nullable time field
    pub fn time(name: impl Into<String>, values: Vec<DateTime<Utc>>) -> Self {
        Self::unchecked(name, FieldType::Time, false, values.into_iter().map(Value::Time))
    }

    // Typed constructors can only produce values of the declared type.
    fn unchecked(
        name: impl Into<String>,
        field_type: FieldType,
        nullable: bool,
        values: impl Iterator<Item = Value>,
    ) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            field_type,
            nullable,
            values: values.collect(),
        }
    }

    /// Attach labels to the field
    #[must_use]
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Return a copy of the field under a different name
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Append a value, checking type and nullability
    pub fn push(&mut self, value: Value) -> Result<()> {
        match value.field_type() {
            None if !self.nullable => return Err(FrameError::null_not_allowed(&self.name)),
            Some(t) if t != self.field_type => {
                return Err(FrameError::type_mismatch(
                    &self.name,
                    self.field_type,
                    t.as_str(),
                ));
            }
            _ => {}
        }
        self.values.push(value);
        Ok(())
    }

    /// Field name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field labels
    #[inline]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Declared value type
    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether the field accepts nulls
    #[inline]
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// All values in row order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a row
    #[inline]
    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Number of rows
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the field has no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Latest known value: the last non-null value in the field
    pub fn latest(&self) -> Option<&Value> {
        self.values.iter().rev().find(|v| !v.is_null())
    }

    /// Latest known value as a number
    pub fn latest_f64(&self) -> Option<f64> {
        self.latest().and_then(Value::as_f64)
    }
}
