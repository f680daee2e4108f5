//! Configuration error types

use std::io;

use live_routing::RoutingError;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse or encode a JSON rule document
    #[error("invalid rule document: {0}")]
    Json(#[from] serde_json::Error),

    /// Pattern syntax error or pattern collision
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// A nested config names a type nobody registered
    #[error("rule '{pattern}': unknown {component} type '{type_name}'")]
    UnknownType {
        /// Component kind (converter, processor, ...)
        component: &'static str,
        /// The unrecognized type name
        type_name: String,
        /// Pattern of the rule that references it
        pattern: String,
    },

    /// A type that needs its own settings section has none
    #[error("rule '{pattern}': {component} type '{type_name}' requires a '{type_name}' section")]
    MissingSettings {
        /// Component kind
        component: &'static str,
        /// Type name, also the expected section key
        type_name: String,
        /// Pattern of the rule
        pattern: String,
    },

    /// Nested configs exceed the nesting limit
    #[error("rule '{pattern}': {component} nesting deeper than {limit} levels")]
    TooDeep {
        /// Component kind
        component: &'static str,
        /// Pattern of the rule
        pattern: String,
        /// Maximum nesting depth
        limit: usize,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an UnknownType error
    pub fn unknown_type(
        component: &'static str,
        type_name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self::UnknownType {
            component,
            type_name: type_name.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a MissingSettings error
    pub fn missing_settings(
        component: &'static str,
        type_name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self::MissingSettings {
            component,
            type_name: type_name.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a TooDeep error
    pub fn too_deep(component: &'static str, pattern: impl Into<String>, limit: usize) -> Self {
        Self::TooDeep {
            component,
            pattern: pattern.into(),
            limit,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
