//! Converters - raw payload to frames
//!
//! Converters are pure functions of (config, channel, bytes). The channel is
//! passed so converters can name frames after the last channel segment.

mod influx;
mod json_auto;
mod json_exact;
mod json_frame;

pub use influx::InfluxAutoConverter;
pub use json_auto::JsonAutoConverter;
pub use json_exact::JsonExactConverter;
pub use json_frame::JsonFrameConverter;

use live_config::ConverterConfig;
use live_frame::Frame;

use crate::registry::Registry;
use crate::TransformResult;

#[cfg(test)]
#[path = "json_auto_test.rs"]
mod json_auto_test;

/// Turns a raw payload into frames
pub trait Converter: Send + Sync {
    /// Convert a payload published to `channel`
    ///
    /// # Errors
    /// Decode errors name the offending field or line.
    fn convert(&self, channel: &str, payload: &[u8]) -> TransformResult<Vec<Frame>>;

    /// Type name for logging
    fn type_name(&self) -> &'static str;
}

/// Builds a converter from its config
pub trait ConverterFactory: Send + Sync {
    fn create(&self, config: &ConverterConfig) -> TransformResult<Box<dyn Converter>>;
}

impl<T> ConverterFactory for T
where
    T: Fn(&ConverterConfig) -> TransformResult<Box<dyn Converter>> + Send + Sync,
{
    fn create(&self, config: &ConverterConfig) -> TransformResult<Box<dyn Converter>> {
        self(config)
    }
}

/// Registry of converter factories
pub type ConverterRegistry = Registry<dyn ConverterFactory>;

impl Registry<dyn ConverterFactory> {
    /// Build the converter a config selects
    pub fn build(&self, config: &ConverterConfig) -> TransformResult<Box<dyn Converter>> {
        self.get(&config.converter_type)?.create(config)
    }
}

/// Registry with all built-in converters
pub fn default_converter_registry() -> ConverterRegistry {
    let mut registry = ConverterRegistry::new("converter");
    registry.register("jsonAuto", Box::new(JsonAutoConverter::from_config));
    registry.register("jsonExact", Box::new(JsonExactConverter::from_config));
    registry.register("influxAuto", Box::new(InfluxAutoConverter::from_config));
    registry.register("jsonFrame", Box::new(JsonFrameConverter::from_config));
    registry
}

/// Frame name for a channel: its last path segment
pub(crate) fn frame_name(channel: &str) -> &str {
    let trimmed = channel.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
