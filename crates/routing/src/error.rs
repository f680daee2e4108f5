//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur while parsing patterns or building a route tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Pattern is empty after trimming slashes
    #[error("empty channel pattern")]
    EmptyPattern,

    /// Pattern syntax is invalid
    #[error("invalid channel pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// What is wrong with it
        reason: String,
    },

    /// Pattern structurally collides with an already registered pattern
    #[error("pattern '{pattern}' conflicts with existing pattern '{existing}'")]
    Collision {
        /// Pattern being inserted
        pattern: String,
        /// Pattern already in the tree
        existing: String,
    },

    /// Channel string is not a valid `scope/namespace/path` address
    #[error("invalid channel '{channel}': {reason}")]
    InvalidChannel {
        /// The offending channel
        channel: String,
        /// What is wrong with it
        reason: String,
    },
}

impl RoutingError {
    /// Create an InvalidPattern error
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a Collision error
    #[inline]
    pub fn collision(pattern: impl Into<String>, existing: impl Into<String>) -> Self {
        Self::Collision {
            pattern: pattern.into(),
            existing: existing.into(),
        }
    }

    /// Create an InvalidChannel error
    #[inline]
    pub fn invalid_channel(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChannel {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}
