//! Processors - frame to frame
//!
//! Processors never fail on shape: dropping or keeping a field that doesn't
//! exist is a no-op, and a frame without fields passes through unchanged.

use std::collections::HashSet;

use live_config::ProcessorConfig;
use live_frame::Frame;

use crate::chain::ProcessorChain;
use crate::registry::{Registry, check_depth};
use crate::{TransformError, TransformResult};

#[cfg(test)]
#[path = "processor_test.rs"]
mod tests;

/// Transforms one frame into another
pub trait Processor: Send + Sync {
    /// Process a frame, returning the new frame
    fn process(&self, frame: Frame) -> TransformResult<Frame>;

    /// Type name for logging
    fn type_name(&self) -> &'static str;
}

/// Builds a processor from its config
///
/// `depth` is the nesting level of `config`; composite factories build their
/// children through `registry` at `depth + 1`.
pub trait ProcessorFactory: Send + Sync {
    fn create(
        &self,
        config: &ProcessorConfig,
        registry: &ProcessorRegistry,
        depth: usize,
    ) -> TransformResult<Box<dyn Processor>>;
}

impl<T> ProcessorFactory for T
where
    T: Fn(&ProcessorConfig, &ProcessorRegistry, usize) -> TransformResult<Box<dyn Processor>>
        + Send
        + Sync,
{
    fn create(
        &self,
        config: &ProcessorConfig,
        registry: &ProcessorRegistry,
        depth: usize,
    ) -> TransformResult<Box<dyn Processor>> {
        self(config, registry, depth)
    }
}

/// Registry of processor factories
pub type ProcessorRegistry = Registry<dyn ProcessorFactory>;

impl Registry<dyn ProcessorFactory> {
    /// Build the processor a top-level config selects
    pub fn build(&self, config: &ProcessorConfig) -> TransformResult<Box<dyn Processor>> {
        self.build_nested(config, 0)
    }

    /// Build a processor nested `depth` levels deep
    pub fn build_nested(
        &self,
        config: &ProcessorConfig,
        depth: usize,
    ) -> TransformResult<Box<dyn Processor>> {
        check_depth(self.component(), depth)?;
        self.get(&config.processor_type)?
            .create(config, self, depth)
    }

    /// Build a chain from a list of configs
    pub fn build_chain(&self, configs: &[ProcessorConfig]) -> TransformResult<ProcessorChain> {
        let processors = configs
            .iter()
            .map(|c| self.build(c))
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(ProcessorChain::new(processors))
    }
}

/// Registry with all built-in processors
pub fn default_processor_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new("processor");
    registry.register("dropFields", Box::new(DropFieldsProcessor::from_config));
    registry.register("keepFields", Box::new(KeepFieldsProcessor::from_config));
    registry.register("multiple", Box::new(build_multiple));
    registry
}

// =============================================================================
// dropFields / keepFields
// =============================================================================

/// Removes the named fields
#[derive(Debug, Clone)]
pub struct DropFieldsProcessor {
    names: HashSet<String>,
}

impl DropFieldsProcessor {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Factory function registered as `dropFields`
    pub fn from_config(
        config: &ProcessorConfig,
        _registry: &ProcessorRegistry,
        _depth: usize,
    ) -> TransformResult<Box<dyn Processor>> {
        let names = config
            .drop_fields
            .as_ref()
            .ok_or_else(|| TransformError::missing_settings("processor", "dropFields"))?;
        Ok(Box::new(Self::new(names.field_names.iter().cloned())))
    }
}

impl Processor for DropFieldsProcessor {
    fn process(&self, frame: Frame) -> TransformResult<Frame> {
        if frame.field_count() == 0 || !frame.fields().iter().any(|f| self.names.contains(f.name())) {
            return Ok(frame);
        }
        Ok(frame.select_fields(|f| !self.names.contains(f.name())))
    }

    fn type_name(&self) -> &'static str {
        "dropFields"
    }
}

/// Keeps only the named fields, in their original order
#[derive(Debug, Clone)]
pub struct KeepFieldsProcessor {
    names: HashSet<String>,
}

impl KeepFieldsProcessor {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Factory function registered as `keepFields`
    pub fn from_config(
        config: &ProcessorConfig,
        _registry: &ProcessorRegistry,
        _depth: usize,
    ) -> TransformResult<Box<dyn Processor>> {
        let names = config
            .keep_fields
            .as_ref()
            .ok_or_else(|| TransformError::missing_settings("processor", "keepFields"))?;
        Ok(Box::new(Self::new(names.field_names.iter().cloned())))
    }
}

impl Processor for KeepFieldsProcessor {
    fn process(&self, frame: Frame) -> TransformResult<Frame> {
        if frame.field_count() == 0 {
            return Ok(frame);
        }
        Ok(frame.select_fields(|f| self.names.contains(f.name())))
    }

    fn type_name(&self) -> &'static str {
        "keepFields"
    }
}

// =============================================================================
// multiple
// =============================================================================

/// Applies child processors in order
struct MultipleProcessor {
    chain: ProcessorChain,
}

impl Processor for MultipleProcessor {
    fn process(&self, frame: Frame) -> TransformResult<Frame> {
        self.chain.apply(frame)
    }

    fn type_name(&self) -> &'static str {
        "multiple"
    }
}

fn build_multiple(
    config: &ProcessorConfig,
    registry: &ProcessorRegistry,
    depth: usize,
) -> TransformResult<Box<dyn Processor>> {
    let multiple = config
        .multiple
        .as_ref()
        .ok_or_else(|| TransformError::missing_settings("processor", "multiple"))?;
    let children = multiple
        .processors
        .iter()
        .map(|child| registry.build_nested(child, depth + 1))
        .collect::<TransformResult<Vec<_>>>()?;
    Ok(Box::new(MultipleProcessor {
        chain: ProcessorChain::new(children),
    }))
}
