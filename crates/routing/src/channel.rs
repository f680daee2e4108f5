//! Channel addresses
//!
//! A live channel is `scope/namespace/path`, e.g. `stream/telegraf/cpu`.
//! The scope selects which kind of handler owns the channel, the namespace
//! selects the handler instance, and the path is free-form within it.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RoutingError};

/// Channel scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Core server features
    Grafana,
    /// Plugin-owned channels
    Plugin,
    /// Data source channels
    DataSource,
    /// Push streams
    Stream,
}

impl Scope {
    /// All scopes
    pub const ALL: [Scope; 4] = [Self::Grafana, Self::Plugin, Self::DataSource, Self::Stream];

    /// Scope prefix as it appears in channels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grafana => "grafana",
            Self::Plugin => "plugin",
            Self::DataSource => "ds",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| RoutingError::invalid_channel(s, format!("unknown scope '{s}'")))
    }
}

/// Parsed channel address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelAddress {
    pub scope: Scope,
    pub namespace: String,
    pub path: String,
}

impl ChannelAddress {
    /// Parse `scope/namespace/path`
    ///
    /// The path may contain further slashes. Every part must be non-empty.
    pub fn parse(channel: &str) -> Result<Self> {
        if !is_valid_channel(channel) {
            return Err(RoutingError::invalid_channel(channel, "invalid characters"));
        }

        let mut parts = channel.splitn(3, '/');
        let scope = parts.next().unwrap_or_default();
        let namespace = parts.next().unwrap_or_default();
        let path = parts.next().unwrap_or_default();

        if scope.is_empty() || namespace.is_empty() || path.is_empty() {
            return Err(RoutingError::invalid_channel(
                channel,
                "expected scope/namespace/path",
            ));
        }

        let scope = scope
            .parse::<Scope>()
            .map_err(|_| RoutingError::invalid_channel(channel, format!("unknown scope '{scope}'")))?;

        Ok(Self {
            scope,
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.namespace, self.path)
    }
}

impl FromStr for ChannelAddress {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whether a channel string only uses allowed characters
///
/// Allowed: ASCII letters and digits, `_`, `-`, `=`, `.` and `/`.
pub fn is_valid_channel(channel: &str) -> bool {
    !channel.is_empty()
        && channel
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'=' | b'.' | b'/'))
}
