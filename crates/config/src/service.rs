//! Service settings: `[pipeline]` and `[storage]` sections

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::MAX_NESTING_DEPTH;

/// Pipeline runtime settings
///
/// ```toml
/// [pipeline]
/// max_redirect_hops = 8
/// remote_write_timeout_ms = 5000
/// subscriber_buffer = 256
/// max_subscribers_per_channel = 1024
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Redirect hops before a publish is rejected as a cycle
    pub max_redirect_hops: usize,

    /// Upper bound for a single remote write request
    pub remote_write_timeout_ms: u64,

    /// Messages buffered per local subscriber before frames are dropped for it
    pub subscriber_buffer: usize,

    /// Local subscribers allowed per (org, channel)
    pub max_subscribers_per_channel: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_redirect_hops: MAX_NESTING_DEPTH,
            remote_write_timeout_ms: 5000,
            subscriber_buffer: 256,
            max_subscribers_per_channel: 1024,
        }
    }
}

impl PipelineConfig {
    /// Remote write timeout as a duration
    pub fn remote_write_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_write_timeout_ms)
    }
}

/// Rule storage settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON rule document; rules are kept in memory only when unset
    pub rules_file: Option<PathBuf>,
}
