//! Channel templates for redirects
//!
//! `{name}` is a route parameter captured by the rule pattern, `{frame}`
//! the frame name and `{field:NAME}` the latest value of field NAME.
//! Templates are parsed when the rule is built; rendering fails if a
//! placeholder has no value or the result is not a valid channel.

use std::sync::LazyLock;

use live_frame::Frame;
use live_routing::{Params, is_valid_channel};
use regex::Regex;

use crate::{PipelineError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
    FrameName,
    Field(String),
}

/// Parsed channel template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTemplate {
    source: String,
    parts: Vec<Part>,
}

impl ChannelTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(PipelineError::template(template, "empty channel"));
        }

        let mut parts = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                parts.push(Part::Literal(template[last..whole.start()].to_string()));
            }
            let name = inner.as_str().trim();
            let part = match name {
                "" => return Err(PipelineError::template(template, "empty placeholder")),
                "frame" => Part::FrameName,
                _ => match name.strip_prefix("field:") {
                    Some("") => return Err(PipelineError::template(template, "empty field name")),
                    Some(field) => Part::Field(field.to_string()),
                    None => Part::Param(name.to_string()),
                },
            };
            parts.push(part);
            last = whole.end();
        }
        if last < template.len() {
            parts.push(Part::Literal(template[last..].to_string()));
        }

        if parts.iter().any(|p| matches!(p, Part::Literal(l) if l.contains(['{', '}']))) {
            return Err(PipelineError::template(template, "unbalanced braces"));
        }

        Ok(Self {
            source: template.to_string(),
            parts,
        })
    }

    /// Template text as configured
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether rendering needs a frame
    pub fn needs_frame(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::FrameName | Part::Field(_)))
    }

    /// Render against captured parameters and (optionally) a frame
    pub fn render(&self, params: &Params, frame: Option<&Frame>) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Param(name) => {
                    let value = params.get(name).ok_or_else(|| {
                        PipelineError::template(&self.source, format!("no parameter '{name}'"))
                    })?;
                    out.push_str(value);
                }
                Part::FrameName => {
                    let frame = self.require_frame(frame)?;
                    out.push_str(frame.name());
                }
                Part::Field(name) => {
                    let value = self
                        .require_frame(frame)?
                        .field(name)
                        .and_then(|f| f.latest())
                        .ok_or_else(|| {
                            PipelineError::template(
                                &self.source,
                                format!("field '{name}' has no value"),
                            )
                        })?;
                    out.push_str(&value.to_string());
                }
            }
        }

        if !is_valid_channel(&out) {
            return Err(PipelineError::template(
                &self.source,
                format!("rendered '{out}' is not a valid channel"),
            ));
        }
        Ok(out)
    }

    fn require_frame<'f>(&self, frame: Option<&'f Frame>) -> Result<&'f Frame> {
        frame.ok_or_else(|| PipelineError::template(&self.source, "no frame to render from"))
    }
}
