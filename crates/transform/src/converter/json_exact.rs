//! `jsonExact` - extract an explicit field list from JSON
//!
//! Each configured field names a value path (`$.a.b`, `$.items[0].v`,
//! `$['odd key']`) or `#{now}`. A required field that is missing or has the
//! wrong type fails the whole payload with an error naming the field.

use chrono::Utc;
use live_config::{ConverterConfig, ExactFieldConfig};
use live_frame::{Field, FieldType, Frame, Labels, Value, parse_json_time};
use serde_json::Value as Json;

use super::{Converter, frame_name};
use crate::{TransformError, TransformResult};

/// Value placeholder for the conversion time
const NOW: &str = "#{now}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// Parsed `$...` value path
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValuePath(Vec<Step>);

impl ValuePath {
    fn parse(path: &str) -> Option<Self> {
        let mut rest = path.strip_prefix('$')?;
        let mut steps = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                if end == 0 {
                    return None;
                }
                steps.push(Step::Key(after[..end].to_string()));
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']')?;
                let inner = &after[..end];
                let quoted = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                let step = match quoted {
                    Some(key) => Step::Key(key.to_string()),
                    None => Step::Index(inner.parse().ok()?),
                };
                steps.push(step);
                rest = &after[end + 1..];
            } else {
                return None;
            }
        }
        Some(Self(steps))
    }

    fn lookup<'a>(&self, root: &'a Json) -> Option<&'a Json> {
        self.0.iter().try_fold(root, |node, step| match step {
            Step::Key(key) => node.get(key.as_str()),
            Step::Index(i) => node.get(*i),
        })
    }
}

#[derive(Debug, Clone)]
enum Source {
    Now,
    Path(ValuePath),
}

#[derive(Debug, Clone)]
enum LabelSource {
    Literal(String),
    Path(ValuePath),
}

#[derive(Debug, Clone)]
struct ExactField {
    name: String,
    field_type: FieldType,
    source: Source,
    labels: Vec<(String, LabelSource)>,
    optional: bool,
}

/// Converter for `jsonExact`
#[derive(Debug, Clone)]
pub struct JsonExactConverter {
    fields: Vec<ExactField>,
}

impl JsonExactConverter {
    /// Compile field configs, checking every value path
    ///
    /// # Errors
    /// `TransformError::Config` naming the field with an invalid path.
    pub fn new(fields: &[ExactFieldConfig]) -> TransformResult<Self> {
        let compiled = fields
            .iter()
            .map(|f| -> TransformResult<ExactField> {
                let source = if f.value == NOW {
                    Source::Now
                } else {
                    Source::Path(parse_path(&f.name, &f.value)?)
                };
                let labels = f
                    .labels
                    .iter()
                    .map(|l| -> TransformResult<(String, LabelSource)> {
                        let source = if l.value.starts_with('$') {
                            LabelSource::Path(parse_path(&f.name, &l.value)?)
                        } else {
                            LabelSource::Literal(l.value.clone())
                        };
                        Ok((l.name.clone(), source))
                    })
                    .collect::<TransformResult<Vec<_>>>()?;
                Ok(ExactField {
                    name: f.name.clone(),
                    field_type: f.field_type,
                    source,
                    labels,
                    optional: f.optional,
                })
            })
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Self { fields: compiled })
    }

    /// Factory function registered as `jsonExact`
    pub fn from_config(config: &ConverterConfig) -> TransformResult<Box<dyn Converter>> {
        let exact = config
            .json_exact
            .as_ref()
            .ok_or_else(|| TransformError::missing_settings("converter", "jsonExact"))?;
        Ok(Box::new(Self::new(&exact.fields)?))
    }
}

fn parse_path(field: &str, path: &str) -> TransformResult<ValuePath> {
    ValuePath::parse(path).ok_or_else(|| {
        TransformError::config(format!("field '{field}': invalid value path '{path}'"))
    })
}

impl Converter for JsonExactConverter {
    fn convert(&self, channel: &str, payload: &[u8]) -> TransformResult<Vec<Frame>> {
        let root: Json = serde_json::from_slice(payload)?;
        let mut frame = Frame::new(frame_name(channel));

        for def in &self.fields {
            let value = match &def.source {
                Source::Now => Value::Time(Utc::now()),
                Source::Path(path) => extract(def, path.lookup(&root))?,
            };

            let mut labels = Labels::new();
            for (name, source) in &def.labels {
                let label = match source {
                    LabelSource::Literal(v) => v.clone(),
                    LabelSource::Path(path) => match path.lookup(&root) {
                        Some(Json::String(s)) => s.clone(),
                        Some(Json::Null) | None => continue,
                        Some(other) => other.to_string(),
                    },
                };
                labels.insert(name.clone(), label);
            }

            let field = Field::from_values(&def.name, def.field_type, def.optional, vec![value])?
                .with_labels(labels);
            frame.push_field(field)?;
        }
        Ok(vec![frame])
    }

    fn type_name(&self) -> &'static str {
        "jsonExact"
    }
}

fn extract(def: &ExactField, found: Option<&Json>) -> TransformResult<Value> {
    let raw = match found {
        Some(v) if !v.is_null() => v,
        _ if def.optional => return Ok(Value::Null),
        _ => {
            return Err(TransformError::decode(format!(
                "field '{}' ({}): value not found",
                def.name, def.field_type
            )));
        }
    };

    let value = match def.field_type {
        FieldType::Float64 => raw.as_f64().map(Value::Float64),
        FieldType::Int64 => raw.as_i64().map(Value::Int64),
        FieldType::Uint64 => raw.as_u64().map(Value::Uint64),
        FieldType::Bool => raw.as_bool().map(Value::Bool),
        FieldType::String => raw.as_str().map(|s| Value::String(s.to_string())),
        FieldType::Time => parse_json_time(raw).map(Value::Time),
    };
    value.ok_or_else(|| {
        TransformError::decode(format!(
            "field '{}' expects {}, got {}",
            def.name, def.field_type, raw
        ))
    })
}
