//! `jsonAuto` - infer a flat frame from arbitrary JSON
//!
//! - An object is one row; an array is one row per element.
//! - Nested objects are flattened with dotted keys (`a.b.c`).
//! - A key whose values are all numbers becomes `float64`, all booleans
//!   `bool`, all strings `string`. Anything else (mixed kinds, arrays)
//!   degrades to `string` holding the JSON text.
//! - Keys missing from some rows, or null, make the field nullable.
//! - `fieldTips` force a type for a key; values that don't fit become null.
//! - A `time` field set to the conversion time is added unless the payload
//!   already has one.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use live_config::{ConverterConfig, FieldTip};
use live_frame::{Field, FieldType, Frame, Value, parse_json_time};
use serde_json::Value as Json;

use super::{Converter, frame_name};
use crate::TransformResult;

/// Name of the field added when a payload has none
const TIME_FIELD: &str = "time";

/// Converter for `jsonAuto`
#[derive(Debug, Clone, Default)]
pub struct JsonAutoConverter {
    field_tips: BTreeMap<String, FieldTip>,
}

impl JsonAutoConverter {
    pub fn new(field_tips: BTreeMap<String, FieldTip>) -> Self {
        Self { field_tips }
    }

    /// Factory function registered as `jsonAuto`
    pub fn from_config(config: &ConverterConfig) -> TransformResult<Box<dyn Converter>> {
        let tips = config
            .json_auto
            .as_ref()
            .map(|c| c.field_tips.clone())
            .unwrap_or_default();
        Ok(Box::new(Self::new(tips)))
    }

    fn build_field(&self, name: &str, cells: &[Option<Json>]) -> TransformResult<Field> {
        if let Some(tip) = self.field_tips.get(name) {
            let values = cells
                .iter()
                .map(|cell| cell.as_ref().map_or(Value::Null, |v| coerce(v, tip.field_type)))
                .collect();
            return Ok(Field::from_values(name, tip.field_type, true, values)?);
        }

        let nullable = cells.iter().any(|c| c.as_ref().is_none_or(Json::is_null));
        let field_type = infer_type(cells);
        let values = cells
            .iter()
            .map(|cell| match cell {
                None | Some(Json::Null) => Value::Null,
                Some(v) => coerce(v, field_type),
            })
            .collect();
        Ok(Field::from_values(name, field_type, nullable, values)?)
    }
}

impl Converter for JsonAutoConverter {
    fn convert(&self, channel: &str, payload: &[u8]) -> TransformResult<Vec<Frame>> {
        let json: Json = serde_json::from_slice(payload)?;
        let rows: Vec<&Json> = match &json {
            Json::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        // Columns in order of first appearance
        let mut names: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut cells: Vec<Vec<Option<Json>>> = Vec::new();

        for (row, item) in rows.iter().enumerate() {
            let mut flat = Vec::new();
            match item {
                Json::Object(_) => flatten("", item, &mut flat),
                scalar => flat.push(("value".to_string(), (*scalar).clone())),
            }
            for (key, value) in flat {
                let col = *index.entry(key.clone()).or_insert_with(|| {
                    names.push(key);
                    cells.push(vec![None; row]);
                    cells.len() - 1
                });
                cells[col].push(Some(value));
            }
            for column in &mut cells {
                column.resize(row + 1, None);
            }
        }

        let mut frame = Frame::new(frame_name(channel));
        if !index.contains_key(TIME_FIELD) {
            let now = Utc::now();
            frame.push_field(Field::time(TIME_FIELD, vec![now; rows.len()]))?;
        }
        for (name, column) in names.iter().zip(&cells) {
            frame.push_field(self.build_field(name, column)?)?;
        }
        Ok(vec![frame])
    }

    fn type_name(&self) -> &'static str {
        "jsonAuto"
    }
}

fn flatten(prefix: &str, value: &Json, out: &mut Vec<(String, Json)>) {
    match value {
        Json::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&name, child, out);
            }
        }
        other => out.push((prefix.to_string(), other.clone())),
    }
}

fn infer_type(cells: &[Option<Json>]) -> FieldType {
    let mut kinds = cells.iter().flatten().filter(|v| !v.is_null());
    let Some(first) = kinds.next() else {
        return FieldType::String;
    };
    let same_kind = |v: &Json| {
        matches!(
            (first, v),
            (Json::Number(_), Json::Number(_))
                | (Json::Bool(_), Json::Bool(_))
                | (Json::String(_), Json::String(_))
        )
    };
    if !kinds.all(same_kind) {
        return FieldType::String;
    }
    match first {
        Json::Number(_) => FieldType::Float64,
        Json::Bool(_) => FieldType::Bool,
        _ => FieldType::String,
    }
}

/// Convert a JSON value to a typed cell, null when it doesn't fit
fn coerce(value: &Json, field_type: FieldType) -> Value {
    let converted = match field_type {
        FieldType::Float64 => value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(Value::Float64),
        FieldType::Int64 => value.as_i64().map(Value::Int64),
        FieldType::Uint64 => value.as_u64().map(Value::Uint64),
        FieldType::Bool => value.as_bool().map(Value::Bool),
        FieldType::Time => parse_json_time(value).map(Value::Time),
        FieldType::String => Some(Value::String(match value {
            Json::String(s) => s.clone(),
            other => other.to_string(),
        })),
    };
    converted.unwrap_or(Value::Null)
}
