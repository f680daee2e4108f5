//! Live Transform
//!
//! The pure, synchronous stages of the live channel pipeline.
//!
//! # Overview
//!
//! ```text
//! [payload] → Converter → [Frame, ...] → Processor chain → [Frame'] → outputters
//!                                                  ConditionChecker ↗
//! ```
//!
//! - `Converter` - raw bytes to frames (`jsonAuto`, `jsonExact`, `influxAuto`, `jsonFrame`)
//! - `Processor` - frame to frame (`dropFields`, `keepFields`, `multiple`)
//! - `ConditionChecker` - frame to bool (`numberCompare`, `multiple`)
//!
//! # Design Principles
//!
//! - **Pure**: every stage is a function of its config and its input; no
//!   shared mutable state, so stages are called concurrently without locks
//! - **Config-driven**: each stage is built by a factory looked up by its
//!   `type` name in a `Registry`; unknown names fail at build time
//! - **Tolerant processors**: missing field names and zero-field frames are
//!   no-ops, never errors
//!
//! # Example
//!
//! ```
//! use live_config::ConverterConfig;
//! use live_transform::default_converter_registry;
//!
//! let converters = default_converter_registry();
//! let converter = converters.build(&ConverterConfig::of_type("jsonAuto")).unwrap();
//!
//! let frames = converter.convert("stream/test/cpu", br#"{"value": 1.5}"#).unwrap();
//! assert_eq!(frames[0].name(), "cpu");
//! assert_eq!(frames[0].field("value").unwrap().latest_f64(), Some(1.5));
//! ```

mod chain;
mod error;
pub mod condition;
pub mod converter;
pub mod processor;
pub mod registry;

pub use chain::ProcessorChain;
pub use condition::{
    ConditionChecker, ConditionFactory, ConditionRegistry, MultipleCondition,
    NumberCompareCondition, default_condition_registry,
};
pub use converter::{
    Converter, ConverterFactory, ConverterRegistry, InfluxAutoConverter, JsonAutoConverter,
    JsonExactConverter, JsonFrameConverter, default_converter_registry,
};
pub use error::TransformError;
pub use processor::{
    DropFieldsProcessor, KeepFieldsProcessor, Processor, ProcessorFactory, ProcessorRegistry,
    default_processor_registry,
};
pub use registry::{Registry, check_depth};

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;
