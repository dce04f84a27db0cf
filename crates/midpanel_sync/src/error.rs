//! Reconciliation error taxonomy.

use midpanel_store::StoreError;
use midpanel_upstream::UpstreamError;
use thiserror::Error;

/// Errors that abort a reconciliation pass.
///
/// Orphan detection is deliberately absent: it is informational and a
/// failure to record an orphan note never fails the pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The upstream fetch failed. The mirror was not modified.
    #[error("{endpoint} endpoint failed: {source}")]
    Upstream {
        /// Label of the endpoint that failed.
        endpoint: String,
        /// The underlying failure.
        #[source]
        source: UpstreamError,
    },

    /// Local storage failed. Fatal to the pass.
    #[error("local storage failed: {0}")]
    Store(#[from] StoreError),

    /// The pass was cancelled between records.
    #[error("reconciliation cancelled")]
    Cancelled,

    /// The actor may not reconcile the requested scope.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// What was missing.
        reason: String,
    },
}

impl ReconcileError {
    pub(crate) fn upstream(endpoint: impl Into<String>, source: UpstreamError) -> Self {
        ReconcileError::Upstream {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        ReconcileError::Forbidden {
            reason: reason.into(),
        }
    }
}

/// Convenience alias for reconciliation results.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_name_the_endpoint() {
        let err = ReconcileError::upstream("primary", UpstreamError::timeout("deadline passed"));
        assert_eq!(
            err.to_string(),
            "primary endpoint failed: upstream timed out: deadline passed"
        );
    }
}
