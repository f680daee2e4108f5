//! Channel pattern syntax

use std::fmt;

use crate::error::{Result, RoutingError};

/// One segment of a parsed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text
    Literal(String),
    /// `:name` - matches any single segment
    Param(String),
    /// `*name` or `*` - matches the rest of the channel (one or more segments)
    CatchAll(Option<String>),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Param(name) => write!(f, ":{name}"),
            Self::CatchAll(Some(name)) => write!(f, "*{name}"),
            Self::CatchAll(None) => f.write_str("*"),
        }
    }
}

/// A parsed, normalized channel pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    normalized: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern string
    ///
    /// # Errors
    ///
    /// Empty patterns, empty inner segments, unnamed `:` parameters, a
    /// catch-all that is not the last segment and repeated parameter names
    /// are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(RoutingError::EmptyPattern);
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (i, part) in parts.iter().copied().enumerate() {
            let last = i + 1 == parts.len();
            let segment = if part.is_empty() {
                return Err(RoutingError::invalid_pattern(raw, "empty segment"));
            } else if let Some(name) = part.strip_prefix(':') {
                check_name(raw, name, &mut names)?;
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if !last {
                    return Err(RoutingError::invalid_pattern(
                        raw,
                        "catch-all must be the last segment",
                    ));
                }
                if name.is_empty() {
                    Segment::CatchAll(None)
                } else {
                    check_name(raw, name, &mut names)?;
                    Segment::CatchAll(Some(name.to_string()))
                }
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            normalized: trimmed.to_string(),
            segments,
        })
    }

    /// Pattern text without leading/trailing slashes
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Parsed segments
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the pattern has no parameter or catch-all segments
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn check_name<'a>(raw: &str, name: &'a str, seen: &mut Vec<&'a str>) -> Result<()> {
    if name.is_empty() {
        return Err(RoutingError::invalid_pattern(raw, "parameter without a name"));
    }
    if name.contains([':', '*']) {
        return Err(RoutingError::invalid_pattern(
            raw,
            format!("invalid parameter name '{name}'"),
        ));
    }
    if seen.contains(&name) {
        return Err(RoutingError::invalid_pattern(
            raw,
            format!("duplicate parameter '{name}'"),
        ));
    }
    seen.push(name);
    Ok(())
}
