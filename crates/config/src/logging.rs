//! `[log]` section
//!
//! The configured level applies to the live crates only. HTTP and runtime
//! dependencies stay at `warn` so a `debug` pipeline log is not buried
//! under connection-pool chatter.

use serde::Deserialize;

/// Targets that follow the configured level
const LIVE_TARGETS: &[&str] = &[
    "live",
    "live_config",
    "live_frame",
    "live_pipeline",
    "live_routing",
    "live_transform",
];

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

/// How the `live` binary logs
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "stderr"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl LogConfig {
    /// `EnvFilter` directive for this config
    ///
    /// Dependencies log at `warn`, or at the configured level when that is
    /// stricter.
    pub fn filter_directive(&self) -> String {
        let base = self.level.max(LogLevel::Warn);
        let mut directive = base.as_str().to_string();
        for target in LIVE_TARGETS {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(self.level.as_str());
        }
        directive
    }
}
