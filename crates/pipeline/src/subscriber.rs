//! Subscribers - decide what a new subscriber receives
//!
//! - `builtin` - delegate to the handler owning the channel's scope
//! - `managedStream` - replay the channel's latest managed frame
//! - `multiple` - run every child; the first initial data wins

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::join_all;
use live_config::SubscriberConfig;
use live_transform::{Registry, TransformError};

use crate::builder::BuildContext;
use crate::context::{ChannelContext, SubscribeReply};
use crate::handler::HandlerSet;
use crate::managed::ManagedStreams;
use crate::{PipelineError, Result};

/// Handles a subscribe request for a channel
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn subscribe(&self, ctx: &ChannelContext<'_>) -> Result<SubscribeReply>;

    /// Type name for logging
    fn type_name(&self) -> &'static str;
}

/// Builds a subscriber from its config
pub trait SubscriberFactory: Send + Sync {
    fn create(
        &self,
        config: &SubscriberConfig,
        ctx: &BuildContext<'_>,
        depth: usize,
    ) -> Result<Box<dyn Subscriber>>;
}

impl<T> SubscriberFactory for T
where
    T: Fn(&SubscriberConfig, &BuildContext<'_>, usize) -> Result<Box<dyn Subscriber>> + Send + Sync,
{
    fn create(
        &self,
        config: &SubscriberConfig,
        ctx: &BuildContext<'_>,
        depth: usize,
    ) -> Result<Box<dyn Subscriber>> {
        self(config, ctx, depth)
    }
}

/// Registry of subscriber factories
pub type SubscriberRegistry = Registry<dyn SubscriberFactory>;

/// Registry with all built-in subscribers
pub fn default_subscriber_registry() -> SubscriberRegistry {
    let mut registry = SubscriberRegistry::new("subscriber");
    registry.register("builtin", Box::new(BuiltinSubscriber::from_config));
    registry.register("managedStream", Box::new(ManagedStreamSubscriber::from_config));
    registry.register("multiple", Box::new(build_multiple));
    registry
}

/// Delegates to the scope handler of the channel
pub struct BuiltinSubscriber {
    handlers: Arc<HandlerSet>,
}

impl BuiltinSubscriber {
    pub fn new(handlers: Arc<HandlerSet>) -> Self {
        Self { handlers }
    }

    pub fn from_config(
        _config: &SubscriberConfig,
        ctx: &BuildContext<'_>,
        _depth: usize,
    ) -> Result<Box<dyn Subscriber>> {
        Ok(Box::new(Self::new(Arc::clone(&ctx.services().handlers))))
    }
}

#[async_trait]
impl Subscriber for BuiltinSubscriber {
    async fn subscribe(&self, ctx: &ChannelContext<'_>) -> Result<SubscribeReply> {
        let (address, handler) = self.handlers.resolve(ctx.channel)?;
        handler.on_subscribe(ctx, &address).await
    }

    fn type_name(&self) -> &'static str {
        "builtin"
    }
}

/// Replays the latest managed frame of the channel
pub struct ManagedStreamSubscriber {
    streams: Arc<ManagedStreams>,
}

impl ManagedStreamSubscriber {
    pub fn new(streams: Arc<ManagedStreams>) -> Self {
        Self { streams }
    }

    pub fn from_config(
        _config: &SubscriberConfig,
        ctx: &BuildContext<'_>,
        _depth: usize,
    ) -> Result<Box<dyn Subscriber>> {
        Ok(Box::new(Self::new(Arc::clone(&ctx.services().streams))))
    }
}

#[async_trait]
impl Subscriber for ManagedStreamSubscriber {
    async fn subscribe(&self, ctx: &ChannelContext<'_>) -> Result<SubscribeReply> {
        match self.streams.latest(ctx.org_id, ctx.channel) {
            Some(frame) => Ok(SubscribeReply::with_data(Bytes::from(frame.to_json_bytes()?))),
            None => Ok(SubscribeReply::default()),
        }
    }

    fn type_name(&self) -> &'static str {
        "managedStream"
    }
}

/// Runs all children
///
/// Every child runs even if a sibling fails. Initial data comes from the
/// first child (in config order) that returned some.
pub struct MultipleSubscriber {
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl MultipleSubscriber {
    pub fn new(subscribers: Vec<Box<dyn Subscriber>>) -> Self {
        Self { subscribers }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[async_trait]
impl Subscriber for MultipleSubscriber {
    async fn subscribe(&self, ctx: &ChannelContext<'_>) -> Result<SubscribeReply> {
        let results = join_all(self.subscribers.iter().map(|s| s.subscribe(ctx))).await;

        let mut reply = SubscribeReply::default();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(child) => {
                    if reply.initial_data.is_none() {
                        reply.initial_data = child.initial_data;
                    }
                }
                Err(PipelineError::Multiple(nested)) => errors.extend(nested),
                Err(e) => errors.push(e),
            }
        }
        PipelineError::collect(errors)?;
        Ok(reply)
    }

    fn type_name(&self) -> &'static str {
        "multiple"
    }
}

fn build_multiple(
    config: &SubscriberConfig,
    ctx: &BuildContext<'_>,
    depth: usize,
) -> Result<Box<dyn Subscriber>> {
    let multiple = config
        .multiple
        .as_ref()
        .ok_or_else(|| TransformError::missing_settings("subscriber", "multiple"))?;
    let subscribers = multiple
        .subscribers
        .iter()
        .map(|child| ctx.build_subscriber(child, depth + 1))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(MultipleSubscriber::new(subscribers)))
}
