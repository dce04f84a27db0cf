//! Upstream error types.

use thiserror::Error;

/// Errors raised while talking to a middleware endpoint.
///
/// Network trouble and timeouts are retryable for idempotent reads; a
/// rejection or a malformed body is not, retrying would only repeat it.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The endpoint could not be reached.
    #[error("upstream unavailable: {message}")]
    Unavailable {
        /// Human-readable transport failure.
        message: String,
    },

    /// The endpoint did not answer within the configured deadline.
    #[error("upstream timed out: {message}")]
    Timeout {
        /// Human-readable timeout description.
        message: String,
    },

    /// The endpoint answered with a non-OK status.
    #[error("upstream rejected the request: {message}")]
    Rejected {
        /// The middleware's own error text, surfaced to the caller.
        message: String,
    },

    /// The endpoint answered with something that does not parse.
    #[error("upstream protocol error: {message}")]
    Protocol {
        /// What failed to parse.
        message: String,
    },
}

impl UpstreamError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// True if retrying the same request could plausibly succeed.
    ///
    /// Only transport-level failures qualify. Callers must still restrict
    /// retries to idempotent reads.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Result alias for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
