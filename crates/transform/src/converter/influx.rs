//! `influxAuto` - Influx line protocol to frames
//!
//! ```text
//! cpu,host=a,region=eu usage=0.5,cores=8i,ok=true,model="x" 1700000000000000000
//! ```
//!
//! One frame per measurement, in order of first appearance. Each frame has a
//! `time` field plus one nullable field per (field key, tag set) series, so
//! tags become field labels. Rows are lines; a series absent from a line is
//! null in that row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use live_config::{ConverterConfig, TimePrecision};
use live_frame::{Field, FieldType, Frame, Labels, Value};

use super::Converter;
use crate::{TransformError, TransformResult};

/// One parsed line
#[derive(Debug, Clone, PartialEq)]
struct Line {
    measurement: String,
    tags: Labels,
    fields: Vec<(String, Value)>,
    timestamp: Option<i64>,
}

/// Converter for `influxAuto`
#[derive(Debug, Clone, Copy, Default)]
pub struct InfluxAutoConverter {
    precision: TimePrecision,
}

impl InfluxAutoConverter {
    pub fn new(precision: TimePrecision) -> Self {
        Self { precision }
    }

    /// Factory function registered as `influxAuto`
    pub fn from_config(config: &ConverterConfig) -> TransformResult<Box<dyn Converter>> {
        let precision = config
            .influx_auto
            .map(|c| c.time_precision)
            .unwrap_or_default();
        Ok(Box::new(Self::new(precision)))
    }

    fn to_time(&self, ts: i64) -> Option<DateTime<Utc>> {
        match self.precision {
            TimePrecision::Ns => Some(DateTime::from_timestamp_nanos(ts)),
            TimePrecision::Us => DateTime::from_timestamp_micros(ts),
            TimePrecision::Ms => DateTime::from_timestamp_millis(ts),
            TimePrecision::S => DateTime::from_timestamp(ts, 0),
        }
    }
}

impl Converter for InfluxAutoConverter {
    fn convert(&self, _channel: &str, payload: &[u8]) -> TransformResult<Vec<Frame>> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| TransformError::decode(format!("payload is not UTF-8: {e}")))?;

        let now = Utc::now();
        let mut order: Vec<String> = Vec::new();
        let mut builders: HashMap<String, MeasurementBuilder> = HashMap::new();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let line = parse_line(trimmed).map_err(|msg| TransformError::line(line_no, msg))?;
            let time = match line.timestamp {
                Some(ts) => self.to_time(ts).ok_or_else(|| {
                    TransformError::line(line_no, format!("timestamp {ts} out of range"))
                })?,
                None => now,
            };

            let builder = builders
                .entry(line.measurement.clone())
                .or_insert_with(|| {
                    order.push(line.measurement.clone());
                    MeasurementBuilder::default()
                });
            builder
                .push(time, &line)
                .map_err(|msg| TransformError::line(line_no, msg))?;
        }

        let mut frames = Vec::with_capacity(order.len());
        for name in order {
            if let Some(builder) = builders.remove(&name) {
                frames.push(builder.finish(name)?);
            }
        }
        Ok(frames)
    }

    fn type_name(&self) -> &'static str {
        "influxAuto"
    }
}

#[derive(Debug)]
struct Series {
    name: String,
    labels: Labels,
    field_type: FieldType,
    values: Vec<Value>,
}

#[derive(Debug, Default)]
struct MeasurementBuilder {
    times: Vec<DateTime<Utc>>,
    series: Vec<Series>,
    index: HashMap<(String, Labels), usize>,
}

impl MeasurementBuilder {
    fn push(&mut self, time: DateTime<Utc>, line: &Line) -> Result<(), String> {
        let row = self.times.len();
        for (key, value) in &line.fields {
            let Some(field_type) = value.field_type() else {
                continue;
            };
            let id = (key.clone(), line.tags.clone());
            let slot = match self.index.get(&id) {
                Some(slot) => *slot,
                None => {
                    self.series.push(Series {
                        name: key.clone(),
                        labels: line.tags.clone(),
                        field_type,
                        values: vec![Value::Null; row],
                    });
                    self.index.insert(id, self.series.len() - 1);
                    self.series.len() - 1
                }
            };
            let series = &mut self.series[slot];
            if series.field_type != field_type {
                return Err(format!(
                    "field '{key}' is {field_type}, earlier lines had {}",
                    series.field_type
                ));
            }
            series.values.truncate(row);
            series.values.push(value.clone());
        }

        self.times.push(time);
        for series in &mut self.series {
            series.values.resize(row + 1, Value::Null);
        }
        Ok(())
    }

    fn finish(self, name: String) -> TransformResult<Frame> {
        let mut frame = Frame::new(name);
        frame.push_field(Field::time("time", self.times))?;
        for series in self.series {
            let field = Field::from_values(series.name, series.field_type, true, series.values)?
                .with_labels(series.labels);
            frame.push_field(field)?;
        }
        Ok(frame)
    }
}

// =============================================================================
// Line parsing
// =============================================================================

fn parse_line(line: &str) -> Result<Line, String> {
    let sections: Vec<&str> = split_unescaped(line, ' ', true)
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    let (keys, field_set, timestamp) = match sections.as_slice() {
        [keys, fields] => (*keys, *fields, None),
        [keys, fields, ts] => (*keys, *fields, Some(*ts)),
        [_] => return Err("missing field set".to_string()),
        _ => return Err("unexpected content after timestamp".to_string()),
    };

    let mut key_parts = split_unescaped(keys, ',', false).into_iter();
    let measurement = unescape(key_parts.next().unwrap_or_default());
    if measurement.is_empty() {
        return Err("missing measurement".to_string());
    }

    let mut tags = Labels::new();
    for tag in key_parts {
        let (k, v) = split_pair(tag).ok_or_else(|| format!("invalid tag '{tag}'"))?;
        tags.insert(unescape(k), unescape(v));
    }

    let mut fields = Vec::new();
    for pair in split_unescaped(field_set, ',', true) {
        let (k, v) = split_pair(pair).ok_or_else(|| format!("invalid field '{pair}'"))?;
        let key = unescape(k);
        let value = parse_field_value(v).ok_or_else(|| format!("invalid value '{v}' for field '{key}'"))?;
        fields.push((key, value));
    }

    let timestamp = timestamp
        .map(|ts| ts.parse::<i64>().map_err(|_| format!("invalid timestamp '{ts}'")))
        .transpose()?;

    Ok(Line {
        measurement,
        tags,
        fields,
        timestamp,
    })
}

/// Split on `sep` unless escaped with `\` (or inside double quotes)
fn split_unescaped(s: &str, sep: char, quotes: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if quotes && c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Split `key=value` on the first unescaped `=`
fn split_pair(s: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' {
            let (k, v) = (&s[..i], &s[i + 1..]);
            return (!k.is_empty() && !v.is_empty()).then_some((k, v));
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && matches!(next, ',' | '=' | ' ' | '"' | '\\')
        {
            out.push(next);
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_field_value(v: &str) -> Option<Value> {
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        return Some(Value::String(unescape(&v[1..v.len() - 1])));
    }
    if let Some(int) = v.strip_suffix('i') {
        return int.parse().ok().map(Value::Int64);
    }
    if let Some(uint) = v.strip_suffix('u') {
        return uint.parse().ok().map(Value::Uint64);
    }
    match v {
        "t" | "T" | "true" | "True" | "TRUE" => return Some(Value::Bool(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Some(Value::Bool(false)),
        _ => {}
    }
    v.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float64)
}
