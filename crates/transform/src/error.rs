//! Transform error types

use live_frame::FrameError;
use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors from building or running converters, processors and conditions
#[derive(Debug, Error)]
pub enum TransformError {
    /// No factory registered for a type name
    #[error("unknown {component} type '{type_name}', available: [{available}]")]
    UnknownType {
        component: &'static str,
        type_name: String,
        available: String,
    },

    /// A type that needs its own settings section has none
    #[error("{component} type '{type_name}' requires a '{type_name}' section")]
    MissingSettings {
        component: &'static str,
        type_name: String,
    },

    /// Composite config nested too deeply
    #[error("{component} nesting deeper than {limit} levels")]
    TooDeep { component: &'static str, limit: usize },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Payload could not be decoded
    #[error("failed to decode payload: {0}")]
    Decode(String),

    /// Line protocol payload failed at a specific line
    #[error("line {line}: {message}")]
    Line { line: usize, message: String },

    /// Frame construction failed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Payload is not valid JSON
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    /// Create a missing settings error
    pub fn missing_settings(component: &'static str, type_name: impl Into<String>) -> Self {
        Self::MissingSettings {
            component,
            type_name: type_name.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a line error (1-based line number)
    pub fn line(line: usize, message: impl Into<String>) -> Self {
        Self::Line {
            line,
            message: message.into(),
        }
    }
}
