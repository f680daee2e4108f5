//! Scope handlers used by the `builtin` subscriber and data outputter
//!
//! A channel's scope (`grafana`, `plugin`, `ds`, `stream`) selects the
//! handler that owns it. Only the `stream` scope has a handler by default:
//! it replays the managed stream on subscribe and accepts frame documents
//! on publish.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use live_frame::Frame;
use live_routing::{ChannelAddress, Scope};

use crate::context::{ChannelContext, SubscribeReply};
use crate::managed::ManagedStreams;
use crate::{PipelineError, Result};

/// Owner of all channels in one scope
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Called when a client subscribes to a channel of this scope
    async fn on_subscribe(
        &self,
        ctx: &ChannelContext<'_>,
        address: &ChannelAddress,
    ) -> Result<SubscribeReply>;

    /// Called with a raw payload published to a channel of this scope
    async fn on_publish(
        &self,
        ctx: &ChannelContext<'_>,
        address: &ChannelAddress,
        data: &[u8],
    ) -> Result<()>;
}

/// Handlers by scope
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: HashMap<Scope, Arc<dyn ChannelHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler set with the `stream` scope handled by managed streams
    pub fn with_streams(streams: Arc<ManagedStreams>) -> Self {
        let mut set = Self::new();
        set.register(Scope::Stream, Arc::new(StreamHandler::new(streams)));
        set
    }

    /// Register (or replace) the handler for a scope
    pub fn register(&mut self, scope: Scope, handler: Arc<dyn ChannelHandler>) {
        self.handlers.insert(scope, handler);
    }

    /// Resolve a channel to its address and handler
    pub fn resolve(&self, channel: &str) -> Result<(ChannelAddress, Arc<dyn ChannelHandler>)> {
        let address = ChannelAddress::parse(channel)?;
        let handler = self
            .handlers
            .get(&address.scope)
            .cloned()
            .ok_or_else(|| PipelineError::NoHandler {
                scope: address.scope.to_string(),
            })?;
        Ok((address, handler))
    }
}

/// `stream` scope handler backed by managed streams
pub struct StreamHandler {
    streams: Arc<ManagedStreams>,
}

impl StreamHandler {
    pub fn new(streams: Arc<ManagedStreams>) -> Self {
        Self { streams }
    }
}

#[async_trait]
impl ChannelHandler for StreamHandler {
    async fn on_subscribe(
        &self,
        ctx: &ChannelContext<'_>,
        _address: &ChannelAddress,
    ) -> Result<SubscribeReply> {
        match self.streams.latest(ctx.org_id, ctx.channel) {
            Some(frame) => Ok(SubscribeReply::with_data(Bytes::from(frame.to_json_bytes()?))),
            None => Ok(SubscribeReply::default()),
        }
    }

    async fn on_publish(
        &self,
        ctx: &ChannelContext<'_>,
        address: &ChannelAddress,
        data: &[u8],
    ) -> Result<()> {
        let mut frame = Frame::from_json_slice(data)?;
        if frame.name().is_empty() {
            frame = frame.renamed(address.path.rsplit('/').next().unwrap_or(&address.path));
        }
        self.streams.push(ctx.org_id, ctx.channel, &frame)?;
        Ok(())
    }
}
