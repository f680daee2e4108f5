//! Remote write outputter - push numeric fields to a metrics backend
//!
//! Each numeric field becomes one time series named `<frame>_<field>`
//! (non metric-name characters replaced by `_`), labelled with the field's
//! labels. Sample timestamps come from the frame's first time field, or the
//! current time when it has none. The body is the JSON form of a remote
//! write request:
//!
//! ```json
//! {"timeseries": [{"labels": {"__name__": "cpu_value", "host": "a"},
//!                  "samples": [{"timestamp": 1700000000000, "value": 0.5}]}]}
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use live_config::{OutputterConfig, RemoteWriteSettings};
use live_frame::{Frame, Value};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Outputter, missing};
use crate::builder::BuildContext;
use crate::context::{ChannelContext, ChannelFrame};
use crate::{PipelineError, Result};

#[cfg(test)]
#[path = "remote_write_test.rs"]
mod tests;

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_:]").expect("metric name pattern is valid"));

/// Remote write request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub timeseries: Vec<TimeSeries>,
}

/// One labelled series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub value: f64,
}

/// Convert a frame into time series (null and non-numeric cells skipped)
pub fn encode_frame(frame: &Frame) -> Vec<TimeSeries> {
    let now = Utc::now().timestamp_millis();
    let times: Vec<i64> = match frame.time_field() {
        Some(field) => field
            .values()
            .iter()
            .map(|v| match v {
                Value::Time(t) => t.timestamp_millis(),
                _ => now,
            })
            .collect(),
        None => vec![now; frame.row_count()],
    };

    frame
        .fields()
        .iter()
        .filter(|f| f.field_type().is_numeric())
        .filter_map(|field| {
            let samples: Vec<Sample> = field
                .values()
                .iter()
                .zip(&times)
                .filter_map(|(value, &timestamp)| {
                    value.as_f64().map(|value| Sample { timestamp, value })
                })
                .collect();
            if samples.is_empty() {
                return None;
            }

            let mut labels = field.labels().clone();
            labels.insert("__name__".to_string(), metric_name(frame.name(), field.name()));
            Some(TimeSeries { labels, samples })
        })
        .collect()
}

fn metric_name(frame: &str, field: &str) -> String {
    let raw = if frame.is_empty() {
        field.to_string()
    } else {
        format!("{frame}_{field}")
    };
    INVALID_NAME_CHARS.replace_all(&raw, "_").into_owned()
}

/// Posts frames to a remote write endpoint
///
/// With a sample interval, frames arriving sooner than the interval after
/// the last successful write are dropped. A write in flight holds the slot;
/// a failed one gives it back.
pub struct RemoteWriteOutputter {
    settings: RemoteWriteSettings,
    client: reqwest::Client,
    timeout: Duration,
    sample_interval: Option<Duration>,
    last_write: Mutex<Option<Instant>>,
}

impl RemoteWriteOutputter {
    pub fn new(settings: RemoteWriteSettings, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            settings,
            client,
            timeout,
            sample_interval: None,
            last_write: Mutex::new(None),
        }
    }

    /// Drop frames arriving within `interval` of the last write
    #[must_use]
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn from_config(
        config: &OutputterConfig,
        ctx: &BuildContext<'_>,
        _depth: usize,
    ) -> Result<Box<dyn Outputter>> {
        let remote_write = config
            .remote_write
            .as_ref()
            .ok_or_else(|| missing("remoteWrite"))?;
        let backend = ctx.backend(&remote_write.uid)?;
        let services = ctx.services();
        Ok(Box::new(
            Self::new(
                backend.settings.clone(),
                services.http.clone(),
                services.remote_write_timeout,
            )
            .with_sample_interval(Duration::from_millis(remote_write.sample_milliseconds)),
        ))
    }

    /// Claim the write slot, `None` when the last write is too recent
    fn claim_sample(&self) -> Option<SampleClaim> {
        let mut last = self.last_write.lock();
        let now = Instant::now();
        if let (Some(interval), Some(at)) = (self.sample_interval, *last) {
            if now.duration_since(at) < interval {
                return None;
            }
        }
        let previous = last.replace(now);
        Some(SampleClaim { at: now, previous })
    }

    /// Undo a claim whose write failed, unless a later one replaced it
    fn release_sample(&self, claim: SampleClaim) {
        let mut last = self.last_write.lock();
        if *last == Some(claim.at) {
            *last = claim.previous;
        }
    }

    async fn send(&self, body: &WriteRequest) -> Result<()> {
        let endpoint = &self.settings.endpoint;
        let mut request = self.client.post(endpoint).timeout(self.timeout).json(body);
        if let Some(user) = &self.settings.user {
            request = request.basic_auth(user, self.settings.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::remote_write(endpoint, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::remote_write(endpoint, format!("status {status}")));
        }
        Ok(())
    }
}

/// Write time recorded by a claim and the one it replaced
struct SampleClaim {
    at: Instant,
    previous: Option<Instant>,
}

#[async_trait]
impl Outputter for RemoteWriteOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        let timeseries = encode_frame(frame);
        if timeseries.is_empty() {
            return Ok(Vec::new());
        }
        let Some(claim) = self.claim_sample() else {
            return Ok(Vec::new());
        };

        let body = WriteRequest { timeseries };
        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.send(&body) => result,
        };
        if let Err(e) = result {
            self.release_sample(claim);
            return Err(e);
        }
        debug!(
            org_id = ctx.org_id,
            channel = ctx.channel,
            endpoint = %self.settings.endpoint,
            series = body.timeseries.len(),
            "remote write sent"
        );
        Ok(Vec::new())
    }

    fn type_name(&self) -> &'static str {
        "remoteWrite"
    }
}
