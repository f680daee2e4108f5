//! Pipeline metrics
//!
//! Atomic counters for publish and subscribe traffic.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the pipeline
///
/// All methods are safe to call from many publish/subscribe calls at once.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Payloads accepted by `dispatch` (redirect hops excluded)
    published: AtomicU64,

    /// Payloads a converter could not decode
    decode_failures: AtomicU64,

    /// Frames handed to a rule's outputters
    frames_output: AtomicU64,

    /// Outputter, processor or data outputter failures
    output_failures: AtomicU64,

    /// Frames or payloads re-dispatched by redirects
    redirects: AtomicU64,

    /// Subscribe calls that succeeded
    subscribes: AtomicU64,

    /// Subscribe calls that were refused or failed
    subscribe_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create metrics with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            frames_output: AtomicU64::new(0),
            output_failures: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
            subscribes: AtomicU64::new(0),
            subscribe_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_frame_output(&self) {
        self.frames_output.fetch_add(1, Ordering::Relaxed);
    }

    /// Record failures, one per isolated sink error
    #[inline]
    pub fn record_output_failures(&self, count: usize) {
        self.output_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_redirects(&self, count: usize) {
        self.redirects.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_subscribe(&self) {
        self.subscribes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_subscribe_failure(&self) {
        self.subscribe_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            frames_output: self.frames_output.load(Ordering::Relaxed),
            output_failures: self.output_failures.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            subscribes: self.subscribes.load(Ordering::Relaxed),
            subscribe_failures: self.subscribe_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pipeline metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub decode_failures: u64,
    pub frames_output: u64,
    pub output_failures: u64,
    pub redirects: u64,
    pub subscribes: u64,
    pub subscribe_failures: u64,
}

impl MetricsSnapshot {
    /// Difference from an earlier snapshot
    pub fn diff(&self, previous: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.saturating_sub(previous.published),
            decode_failures: self
                .decode_failures
                .saturating_sub(previous.decode_failures),
            frames_output: self.frames_output.saturating_sub(previous.frames_output),
            output_failures: self
                .output_failures
                .saturating_sub(previous.output_failures),
            redirects: self.redirects.saturating_sub(previous.redirects),
            subscribes: self.subscribes.saturating_sub(previous.subscribes),
            subscribe_failures: self
                .subscribe_failures
                .saturating_sub(previous.subscribe_failures),
        }
    }
}
