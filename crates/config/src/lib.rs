//! Live Configuration
//!
//! Two kinds of configuration live here:
//!
//! - **Service config** (TOML): logging, pipeline limits and where rules are
//!   stored. Every section is optional; an empty file is a valid config.
//! - **Channel rules** (JSON): `ChannelRuleConfig` rows and
//!   `RemoteWriteBackend` rows, normally kept in a `RulesDocument`.
//!
//! # Parsing
//!
//! ```
//! use live_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[pipeline]\nmax_redirect_hops = 4").unwrap();
//! assert_eq!(config.pipeline.max_redirect_hops, 4);
//! ```
//!
//! # Validating rules
//!
//! ```
//! use live_config::{ChannelRuleConfig, OutputterConfig, check_rules_valid};
//!
//! let rules = vec![
//!     ChannelRuleConfig::new(1, "stream/a/*").with_output(OutputterConfig::managed_stream()),
//!     ChannelRuleConfig::new(1, "stream/a/b").with_output(OutputterConfig::of_type("bogus")),
//! ];
//! let err = check_rules_valid(&rules).unwrap_err();
//! assert!(err.to_string().contains("bogus"));
//! ```

mod error;
mod logging;
mod rules;
mod service;
mod types;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use rules::{
    ChangeLogOutputConfig, ChannelRuleConfig, ChannelRuleSettings, ConditionCheckerConfig,
    ConditionType, ConditionalOutputConfig, ConverterConfig, DataOutputterConfig,
    ExactFieldConfig, FieldNamesConfig, FieldTip, InfluxAutoConfig, JsonAutoConfig,
    JsonExactConfig, JsonFrameConfig, LabelConfig, MultipleConditionConfig,
    MultipleOutputterConfig, MultipleProcessorConfig, MultipleSubscriberConfig,
    NumberCompareConfig, NumberCompareOp, OrgId, OutputterConfig, ProcessorConfig,
    RedirectConfig, RemoteWriteBackend, RemoteWriteOutputConfig, RemoteWriteSettings, Role,
    RoleCheckConfig, RuleAuthConfig, RulesDocument, SubscriberConfig, ThresholdOutputConfig,
    TimePrecision,
};
pub use service::{PipelineConfig, StorageConfig};
pub use types::{
    KNOWN_CONDITION_TYPES, KNOWN_CONVERTER_TYPES, KNOWN_DATA_OUTPUTTER_TYPES,
    KNOWN_OUTPUTTER_TYPES, KNOWN_PROCESSOR_TYPES, KNOWN_SUBSCRIBER_TYPES, MAX_NESTING_DEPTH,
    is_known_condition_type, is_known_converter_type, is_known_data_outputter_type,
    is_known_outputter_type, is_known_processor_type, is_known_subscriber_type,
};
pub use validation::{BuiltinTypes, TypeCatalog, check_rules_valid, check_rules_valid_with};

use serde::Deserialize;


/// Service configuration
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Pipeline limits
    pub pipeline: PipelineConfig,

    /// Rule storage
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.pipeline.validate()?;
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
