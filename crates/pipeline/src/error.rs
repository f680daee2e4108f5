//! Pipeline error types

use live_config::{ConfigError, OrgId, Role};
use live_frame::FrameError;
use live_routing::RoutingError;
use live_transform::TransformError;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Converter, processor or condition failure
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Invalid rule configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Frame construction or encoding failure
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Pattern or channel error
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// A rule failed to build
    #[error("rule '{pattern}': {source}")]
    Build {
        pattern: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// `remoteWrite` references a backend the organization doesn't have
    #[error("unknown remote write backend '{uid}'")]
    UnknownBackend { uid: String },

    /// No rule matches the channel
    #[error("no rule matches channel '{channel}'")]
    NoRule { channel: String },

    /// Caller's role is below what the rule requires
    #[error("{action} on '{channel}' requires role {required}, caller has {actual}")]
    Forbidden {
        action: &'static str,
        channel: String,
        required: Role,
        actual: Role,
    },

    /// Redirects went around more often than allowed
    #[error("redirect limit of {limit} hops exceeded at channel '{channel}'")]
    TooManyHops { channel: String, limit: usize },

    /// Channel template could not be rendered
    #[error("channel template '{template}': {reason}")]
    Template { template: String, reason: String },

    /// No handler registered for a channel scope
    #[error("no handler for scope '{scope}'")]
    NoHandler { scope: String },

    /// Local subscriber cap reached
    #[error("channel '{channel}' already has {limit} local subscribers")]
    TooManySubscribers { channel: String, limit: usize },

    /// Remote write request failed
    #[error("remote write to '{endpoint}' failed: {message}")]
    RemoteWrite { endpoint: String, message: String },

    /// Rule already exists
    #[error("rule '{pattern}' already exists in org {org_id}")]
    RuleExists { org_id: OrgId, pattern: String },

    /// Rule not found
    #[error("rule '{pattern}' not found in org {org_id}")]
    RuleNotFound { org_id: OrgId, pattern: String },

    /// Rule storage I/O failure
    #[error("rule storage at '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Several isolated sinks failed
    #[error("{}", join_errors(.0))]
    Multiple(Vec<PipelineError>),
}

fn join_errors(errors: &[PipelineError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PipelineError {
    /// Wrap an error with the pattern of the rule being built
    pub fn build(pattern: impl Into<String>, source: PipelineError) -> Self {
        Self::Build {
            pattern: pattern.into(),
            source: Box::new(source),
        }
    }

    /// Create a template error
    pub fn template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create a remote write error
    pub fn remote_write(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteWrite {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Collapse collected errors: none is `Ok`, one is itself, more are `Multiple`
    pub fn collect(mut errors: Vec<PipelineError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Errors contained in this one (itself unless `Multiple`)
    pub fn errors(&self) -> Vec<&PipelineError> {
        match self {
            Self::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::NoRule {
            channel: "stream/a/b".into(),
        };
        assert_eq!(err.to_string(), "no rule matches channel 'stream/a/b'");

        let err = PipelineError::Forbidden {
            action: "publish",
            channel: "stream/a/b".into(),
            required: Role::Admin,
            actual: Role::Viewer,
        };
        assert_eq!(
            err.to_string(),
            "publish on 'stream/a/b' requires role admin, caller has viewer"
        );

        let err = PipelineError::build(
            "stream/x",
            PipelineError::UnknownBackend { uid: "prom".into() },
        );
        assert_eq!(
            err.to_string(),
            "rule 'stream/x': unknown remote write backend 'prom'"
        );
    }

    #[test]
    fn test_multiple_joins_messages() {
        let err = PipelineError::Multiple(vec![
            PipelineError::Cancelled,
            PipelineError::remote_write("http://x", "timeout"),
        ]);
        assert_eq!(
            err.to_string(),
            "operation cancelled; remote write to 'http://x' failed: timeout"
        );
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn test_collect() {
        assert!(PipelineError::collect(vec![]).is_ok());

        let err = PipelineError::collect(vec![PipelineError::Cancelled]).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));

        let err = PipelineError::collect(vec![PipelineError::Cancelled, PipelineError::Cancelled])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Multiple(ref e) if e.len() == 2));
    }
}
