//! JSON frame documents
//!
//! Frames are exchanged with subscribers and accepted from publishers as:
//!
//! ```json
//! {
//!   "name": "cpu",
//!   "fields": [
//!     {"name": "time", "type": "time", "values": ["2024-01-01T00:00:00Z"]},
//!     {"name": "value", "type": "float64", "nullable": true,
//!      "labels": {"host": "a"}, "values": [0.5]}
//!   ]
//! }
//! ```
//!
//! Times are RFC 3339 strings on output; epoch milliseconds are accepted on input.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{FrameError, Result};
use crate::field::{Field, FieldType, Labels, Value};
use crate::frame::Frame;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameDoc {
    #[serde(default)]
    name: String,
    fields: Vec<FieldDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDoc {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    nullable: bool,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    labels: Labels,
    values: Vec<Json>,
}

impl Frame {
    /// Encode as a JSON document
    pub fn to_json(&self) -> Json {
        let doc = FrameDoc {
            name: self.name().to_string(),
            fields: self
                .fields()
                .iter()
                .map(|f| FieldDoc {
                    name: f.name().to_string(),
                    field_type: f.field_type(),
                    nullable: f.nullable(),
                    labels: f.labels().clone(),
                    values: f.values().iter().map(value_to_json).collect(),
                })
                .collect(),
        };
        serde_json::to_value(doc).unwrap_or(Json::Null)
    }

    /// Encode as JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_json())?)
    }

    /// Decode a single frame document
    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        let json: Json = serde_json::from_slice(data)?;
        Self::from_json(json)
    }

    /// Decode a frame from an already parsed JSON value
    pub fn from_json(json: Json) -> Result<Self> {
        let doc: FrameDoc = serde_json::from_value(json)?;
        let mut frame = Frame::new(doc.name);
        for field_doc in doc.fields {
            let mut field = Field::new(field_doc.name, field_doc.field_type, field_doc.nullable)
                .with_labels(field_doc.labels);
            for (row, raw) in field_doc.values.into_iter().enumerate() {
                let value = json_to_value(field.name(), field.field_type(), row, raw)?;
                field.push(value)?;
            }
            frame.push_field(field)?;
        }
        Ok(frame)
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Float64(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Int64(v) => Json::from(*v),
        Value::Uint64(v) => Json::from(*v),
        Value::String(v) => Json::String(v.clone()),
        Value::Bool(v) => Json::Bool(*v),
        Value::Time(v) => Json::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

fn json_to_value(field: &str, field_type: FieldType, row: usize, raw: Json) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let converted = match field_type {
        FieldType::Float64 => raw.as_f64().map(Value::Float64),
        FieldType::Int64 => raw.as_i64().map(Value::Int64),
        FieldType::Uint64 => raw.as_u64().map(Value::Uint64),
        FieldType::Bool => raw.as_bool().map(Value::Bool),
        FieldType::String => raw.as_str().map(|s| Value::String(s.to_string())),
        FieldType::Time => parse_json_time(&raw).map(Value::Time),
    };

    converted.ok_or_else(|| {
        FrameError::type_mismatch(field, field_type, format!("{} at row {}", json_kind(&raw), row))
    })
}

/// Parse a time from an RFC 3339 string or epoch milliseconds
pub fn parse_json_time(raw: &Json) -> Option<DateTime<Utc>> {
    match raw {
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Json::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn json_kind(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
