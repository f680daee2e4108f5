//! Call contexts and stage outputs

use bytes::Bytes;
use live_config::{OrgId, Role};
use live_frame::Frame;
use live_routing::Params;
use tokio_util::sync::CancellationToken;

/// Caller of a publish or subscribe
#[derive(Debug, Clone)]
pub struct LiveContext {
    /// Caller's role in the organization
    pub role: Role,
    /// Cancels in-flight remote writes and stops redirect processing
    pub cancel: CancellationToken,
}

impl LiveContext {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an existing cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What outputters, subscribers and data outputters know about the call
#[derive(Debug, Clone, Copy)]
pub struct ChannelContext<'a> {
    pub org_id: OrgId,
    /// Concrete channel being handled
    pub channel: &'a str,
    /// Parameters captured by the matched rule pattern
    pub params: &'a Params,
    pub cancel: &'a CancellationToken,
}

/// A frame to dispatch to another channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrame {
    pub channel: String,
    pub frame: Frame,
}

impl ChannelFrame {
    pub fn new(channel: impl Into<String>, frame: Frame) -> Self {
        Self {
            channel: channel.into(),
            frame,
        }
    }
}

/// A raw payload to dispatch to another channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelData {
    pub channel: String,
    pub data: Bytes,
}

/// Result of a subscribe call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscribeReply {
    /// Initial data sent to the new subscriber (a JSON frame document)
    pub initial_data: Option<Bytes>,
}

impl SubscribeReply {
    pub fn with_data(data: impl Into<Bytes>) -> Self {
        Self {
            initial_data: Some(data.into()),
        }
    }
}
