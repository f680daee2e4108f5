//! Data outputters - act on the raw payload before conversion
//!
//! - `redirect` - re-dispatch the unconverted bytes to another channel
//! - `builtin` - hand the bytes to the scope handler of the channel

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use live_config::DataOutputterConfig;
use live_transform::{Registry, TransformError};

use crate::builder::BuildContext;
use crate::context::{ChannelContext, ChannelData};
use crate::handler::HandlerSet;
use crate::template::ChannelTemplate;
use crate::{PipelineError, Result};

/// Receives the raw payload published to a channel
#[async_trait]
pub trait DataOutputter: Send + Sync {
    /// Deliver the payload; returned pairs are dispatched by the caller
    async fn output_data(&self, ctx: &ChannelContext<'_>, data: &[u8]) -> Result<Vec<ChannelData>>;

    fn type_name(&self) -> &'static str;
}

/// Builds a data outputter from its config
pub trait DataOutputterFactory: Send + Sync {
    fn create(
        &self,
        config: &DataOutputterConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn DataOutputter>>;
}

impl<T> DataOutputterFactory for T
where
    T: Fn(&DataOutputterConfig, &BuildContext<'_>) -> Result<Box<dyn DataOutputter>> + Send + Sync,
{
    fn create(
        &self,
        config: &DataOutputterConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn DataOutputter>> {
        self(config, ctx)
    }
}

/// Registry of data outputter factories
pub type DataOutputterRegistry = Registry<dyn DataOutputterFactory>;

/// Registry with all built-in data outputters
pub fn default_data_outputter_registry() -> DataOutputterRegistry {
    let mut registry = DataOutputterRegistry::new("data outputter");
    registry.register("redirect", Box::new(build_redirect));
    registry.register("builtin", Box::new(BuiltinDataOutputter::from_config));
    registry
}

/// Forwards the raw payload to another channel
pub struct RedirectDataOutputter {
    channel: ChannelTemplate,
}

impl RedirectDataOutputter {
    /// The template may only use route parameters: there is no frame yet
    pub fn new(channel: ChannelTemplate) -> Result<Self> {
        if channel.needs_frame() {
            return Err(PipelineError::template(
                channel.as_str(),
                "frame placeholders are not available for raw data",
            ));
        }
        Ok(Self { channel })
    }
}

#[async_trait]
impl DataOutputter for RedirectDataOutputter {
    async fn output_data(&self, ctx: &ChannelContext<'_>, data: &[u8]) -> Result<Vec<ChannelData>> {
        let channel = self.channel.render(ctx.params, None)?;
        Ok(vec![ChannelData {
            channel,
            data: Bytes::copy_from_slice(data),
        }])
    }

    fn type_name(&self) -> &'static str {
        "redirect"
    }
}

fn build_redirect(
    config: &DataOutputterConfig,
    _ctx: &BuildContext<'_>,
) -> Result<Box<dyn DataOutputter>> {
    let redirect = config
        .redirect
        .as_ref()
        .ok_or_else(|| TransformError::missing_settings("data outputter", "redirect"))?;
    Ok(Box::new(RedirectDataOutputter::new(ChannelTemplate::parse(
        &redirect.channel,
    )?)?))
}

/// Passes the payload to the channel's scope handler
pub struct BuiltinDataOutputter {
    handlers: Arc<HandlerSet>,
}

impl BuiltinDataOutputter {
    pub fn new(handlers: Arc<HandlerSet>) -> Self {
        Self { handlers }
    }

    pub fn from_config(
        _config: &DataOutputterConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn DataOutputter>> {
        Ok(Box::new(Self::new(Arc::clone(&ctx.services().handlers))))
    }
}

#[async_trait]
impl DataOutputter for BuiltinDataOutputter {
    async fn output_data(&self, ctx: &ChannelContext<'_>, data: &[u8]) -> Result<Vec<ChannelData>> {
        let (address, handler) = self.handlers.resolve(ctx.channel)?;
        handler.on_publish(ctx, &address, data).await?;
        Ok(Vec::new())
    }

    fn type_name(&self) -> &'static str {
        "builtin"
    }
}
