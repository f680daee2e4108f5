//! Outputters - frame to side effects
//!
//! An outputter receives a processed frame and may return further
//! (channel, frame) pairs; the pipeline dispatches those through the route
//! tree again. This is how `redirect`, `threshold` and `changeLog` hand
//! their output to other rules.
//!
//! | Type               | Effect                                               |
//! |--------------------|------------------------------------------------------|
//! | `managedStream`    | Keep as latest frame of the channel, broadcast       |
//! | `localSubscribers` | Broadcast to subscribers on this node                |
//! | `redirect`         | Re-dispatch to a templated channel                   |
//! | `conditional`      | Forward to a wrapped outputter if a condition holds  |
//! | `threshold`        | Emit load/unload transitions per dimension           |
//! | `changeLog`        | Emit previous/current when a field's value changes   |
//! | `remoteWrite`      | POST numeric fields to a remote write backend        |
//! | `multiple`         | Fan out to children, isolating their failures        |

mod change_log;
mod remote_write;
mod threshold;

pub use change_log::ChangeLogOutputter;
pub use remote_write::{RemoteWriteOutputter, Sample, TimeSeries, WriteRequest, encode_frame};
pub use threshold::{
    ThresholdOutputter, ThresholdState, Transition, evaluate_hysteresis, evaluate_transitions,
};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::join_all;
use live_config::OutputterConfig;
use live_frame::Frame;
use live_transform::{ConditionChecker, Registry, TransformError};
use tracing::{debug, warn};

use crate::builder::BuildContext;
use crate::context::{ChannelContext, ChannelFrame};
use crate::hub::LocalHub;
use crate::managed::ManagedStreams;
use crate::template::ChannelTemplate;
use crate::{PipelineError, Result};

#[cfg(test)]
#[path = "outputter_test.rs"]
mod tests;

/// Sends a frame somewhere
#[async_trait]
pub trait Outputter: Send + Sync {
    /// Deliver a frame; returned pairs are dispatched by the caller
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>>;

    /// Type name for logging
    fn type_name(&self) -> &'static str;
}

/// Builds an outputter from its config
pub trait OutputterFactory: Send + Sync {
    fn create(
        &self,
        config: &OutputterConfig,
        ctx: &BuildContext<'_>,
        depth: usize,
    ) -> Result<Box<dyn Outputter>>;
}

impl<T> OutputterFactory for T
where
    T: Fn(&OutputterConfig, &BuildContext<'_>, usize) -> Result<Box<dyn Outputter>> + Send + Sync,
{
    fn create(
        &self,
        config: &OutputterConfig,
        ctx: &BuildContext<'_>,
        depth: usize,
    ) -> Result<Box<dyn Outputter>> {
        self(config, ctx, depth)
    }
}

/// Registry of outputter factories
pub type OutputterRegistry = Registry<dyn OutputterFactory>;

/// Registry with all built-in outputters
pub fn default_outputter_registry() -> OutputterRegistry {
    let mut registry = OutputterRegistry::new("outputter");
    registry.register("managedStream", Box::new(build_managed_stream));
    registry.register("localSubscribers", Box::new(build_local_subscribers));
    registry.register("redirect", Box::new(build_redirect));
    registry.register("conditional", Box::new(build_conditional));
    registry.register("threshold", Box::new(ThresholdOutputter::from_config));
    registry.register("remoteWrite", Box::new(RemoteWriteOutputter::from_config));
    registry.register("changeLog", Box::new(ChangeLogOutputter::from_config));
    registry.register("multiple", Box::new(build_multiple));
    registry
}

/// Error for a type whose own section is missing
pub(crate) fn missing(type_name: &str) -> PipelineError {
    TransformError::missing_settings("outputter", type_name).into()
}

// =============================================================================
// managedStream / localSubscribers
// =============================================================================

/// Keeps the frame as the channel's latest and broadcasts it
pub struct ManagedStreamOutputter {
    streams: Arc<ManagedStreams>,
}

impl ManagedStreamOutputter {
    pub fn new(streams: Arc<ManagedStreams>) -> Self {
        Self { streams }
    }
}

#[async_trait]
impl Outputter for ManagedStreamOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        self.streams.push(ctx.org_id, ctx.channel, frame)?;
        Ok(Vec::new())
    }

    fn type_name(&self) -> &'static str {
        "managedStream"
    }
}

fn build_managed_stream(
    _config: &OutputterConfig,
    ctx: &BuildContext<'_>,
    _depth: usize,
) -> Result<Box<dyn Outputter>> {
    Ok(Box::new(ManagedStreamOutputter::new(Arc::clone(
        &ctx.services().streams,
    ))))
}

/// Broadcasts the frame to this node's subscribers of the channel
pub struct LocalSubscribersOutputter {
    hub: Arc<LocalHub>,
}

impl LocalSubscribersOutputter {
    pub fn new(hub: Arc<LocalHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Outputter for LocalSubscribersOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        let data = Bytes::from(frame.to_json_bytes()?);
        let delivered = self.hub.publish(ctx.org_id, ctx.channel, data);
        debug!(org_id = ctx.org_id, channel = ctx.channel, delivered, "frame sent to local subscribers");
        Ok(Vec::new())
    }

    fn type_name(&self) -> &'static str {
        "localSubscribers"
    }
}

fn build_local_subscribers(
    _config: &OutputterConfig,
    ctx: &BuildContext<'_>,
    _depth: usize,
) -> Result<Box<dyn Outputter>> {
    Ok(Box::new(LocalSubscribersOutputter::new(Arc::clone(
        &ctx.services().hub,
    ))))
}

// =============================================================================
// redirect / conditional
// =============================================================================

/// Hands the frame to another channel
pub struct RedirectOutputter {
    channel: ChannelTemplate,
}

impl RedirectOutputter {
    pub fn new(channel: ChannelTemplate) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Outputter for RedirectOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        let channel = self.channel.render(ctx.params, Some(frame))?;
        Ok(vec![ChannelFrame::new(channel, frame.clone())])
    }

    fn type_name(&self) -> &'static str {
        "redirect"
    }
}

fn build_redirect(
    config: &OutputterConfig,
    _ctx: &BuildContext<'_>,
    _depth: usize,
) -> Result<Box<dyn Outputter>> {
    let redirect = config.redirect.as_ref().ok_or_else(|| missing("redirect"))?;
    Ok(Box::new(RedirectOutputter::new(ChannelTemplate::parse(
        &redirect.channel,
    )?)))
}

/// Forwards to the wrapped outputter only when the condition holds
///
/// A frame that fails the condition is dropped without error.
pub struct ConditionalOutputter {
    condition: Box<dyn ConditionChecker>,
    output: Box<dyn Outputter>,
}

impl ConditionalOutputter {
    pub fn new(condition: Box<dyn ConditionChecker>, output: Box<dyn Outputter>) -> Self {
        Self { condition, output }
    }
}

#[async_trait]
impl Outputter for ConditionalOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        if !self.condition.check(frame) {
            debug!(org_id = ctx.org_id, channel = ctx.channel, "condition not met, frame dropped");
            return Ok(Vec::new());
        }
        self.output.output(ctx, frame).await
    }

    fn type_name(&self) -> &'static str {
        "conditional"
    }
}

fn build_conditional(
    config: &OutputterConfig,
    ctx: &BuildContext<'_>,
    depth: usize,
) -> Result<Box<dyn Outputter>> {
    let conditional = config
        .conditional
        .as_ref()
        .ok_or_else(|| missing("conditional"))?;
    let condition = ctx.build_condition(&conditional.condition)?;
    let output = ctx.build_outputter(&conditional.output, depth + 1)?;
    Ok(Box::new(ConditionalOutputter::new(condition, output)))
}

// =============================================================================
// multiple
// =============================================================================

/// Fans a frame out to all children
///
/// Children run concurrently. Every child runs even if a sibling fails;
/// failures are collected, never short-circuited.
pub struct MultipleOutputter {
    outputs: Vec<Box<dyn Outputter>>,
}

impl MultipleOutputter {
    pub fn new(outputs: Vec<Box<dyn Outputter>>) -> Self {
        Self { outputs }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Run every child, returning the frames they produced and their errors
    pub async fn output_all(
        &self,
        ctx: &ChannelContext<'_>,
        frame: &Frame,
    ) -> (Vec<ChannelFrame>, Vec<PipelineError>) {
        let results = join_all(self.outputs.iter().map(|o| o.output(ctx, frame))).await;

        let mut frames = Vec::new();
        let mut errors = Vec::new();
        for (outputter, result) in self.outputs.iter().zip(results) {
            match result {
                Ok(produced) => frames.extend(produced),
                Err(PipelineError::Multiple(nested)) => errors.extend(nested),
                Err(e) => {
                    warn!(
                        org_id = ctx.org_id,
                        channel = ctx.channel,
                        outputter = outputter.type_name(),
                        error = %e,
                        "outputter failed"
                    );
                    errors.push(e);
                }
            }
        }
        (frames, errors)
    }
}

#[async_trait]
impl Outputter for MultipleOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        let (frames, errors) = self.output_all(ctx, frame).await;
        if errors.is_empty() {
            Ok(frames)
        } else {
            Err(PipelineError::Multiple(errors))
        }
    }

    fn type_name(&self) -> &'static str {
        "multiple"
    }
}

fn build_multiple(
    config: &OutputterConfig,
    ctx: &BuildContext<'_>,
    depth: usize,
) -> Result<Box<dyn Outputter>> {
    let multiple = config.multiple.as_ref().ok_or_else(|| missing("multiple"))?;
    let outputs = multiple
        .outputs
        .iter()
        .map(|child| ctx.build_outputter(child, depth + 1))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(MultipleOutputter::new(outputs)))
}
