//! Error types for mvsense-ai
//!
//! Configuration errors are fatal before the first run. Every other variant
//! is scoped to a single pipeline run: the orchestrator logs it and returns
//! to Idle.

use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required credential or setting absent; process exits before any run
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Upstream could not be reached or refused the request
    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable {
        service: &'static str,
        reason: String,
    },

    /// Recognition service rejected a detection request
    #[error("Recognition {operation} failed: {reason}")]
    Recognition {
        operation: &'static str,
        reason: String,
    },

    /// Upstream answered with an unexpected shape
    #[error("Malformed response from {service}: {reason}")]
    MalformedResponse {
        service: &'static str,
        reason: String,
    },

    /// Snapshot never became retrievable within the probe budget
    #[error("Snapshot not retrievable after {attempts} probes ({elapsed_ms} ms)")]
    PollTimeout { attempts: u32, elapsed_ms: u128 },

    /// A recognition call exceeded its deadline
    #[error("Recognition {operation} timed out after {timeout_ms} ms")]
    RecognitionTimeout {
        operation: &'static str,
        timeout_ms: u128,
    },

    /// Bus refused a publish
    #[error("Publish failed: {0}")]
    Publish(String),

    /// mvsense-common error
    #[error("Common error: {0}")]
    Common(#[from] mvsense_common::Error),
}

impl PipelineError {
    pub(crate) fn upstream(service: &'static str, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(service: &'static str, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            service,
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly kind for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Recognition { .. } => "recognition_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::PollTimeout { .. } => "poll_timeout",
            Self::RecognitionTimeout { .. } => "recognition_timeout",
            Self::Publish(_) => "publish_failed",
            Self::Common(_) => "common",
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_service() {
        let err = PipelineError::upstream("meraki", "connection refused");
        assert_eq!(err.to_string(), "meraki unavailable: connection refused");
        assert_eq!(err.kind(), "upstream_unavailable");
    }

    #[test]
    fn test_poll_timeout_message() {
        let err = PipelineError::PollTimeout {
            attempts: 3,
            elapsed_ms: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Snapshot not retrievable after 3 probes (2000 ms)"
        );
    }
}
