//! Processor Chain - Sequential frame transformation
//!
//! The `ProcessorChain` applies a rule's processors in configured order,
//! each receiving the output of the previous one.
//!
//! # Design
//!
//! - **Identity when empty**: an empty chain returns the frame untouched
//! - **Sequential execution**: processors run in order
//! - **Fail-fast**: the first error stops the chain for this frame only

use live_frame::Frame;
use tracing::debug;

use crate::processor::Processor;
use crate::TransformResult;

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Chain of processors applied sequentially
#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    /// Create a chain from processors in the order they should run
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    /// Create an empty chain (identity)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of processors
    #[inline]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Type names of all processors, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.type_name()).collect()
    }

    /// Run a frame through every processor in sequence
    pub fn apply(&self, frame: Frame) -> TransformResult<Frame> {
        self.processors.iter().try_fold(frame, |current, processor| {
            processor.process(current).inspect_err(|e| {
                debug!(processor = processor.type_name(), error = %e, "processor failed");
            })
        })
    }
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("processors", &self.names())
            .finish()
    }
}
