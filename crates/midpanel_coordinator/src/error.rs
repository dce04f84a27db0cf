//! Coordinator error taxonomy.

use midpanel_ledger::LedgerError;
use midpanel_store::StoreError;
use midpanel_upstream::UpstreamError;
use thiserror::Error;

/// Errors surfaced by the write coordinator.
///
/// A secondary failure on a best-effort path is not represented here; it
/// travels as a [`ReplicaWarning`](crate::ReplicaWarning) inside a
/// successful outcome.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The operation was rejected before any endpoint was contacted.
    #[error("validation failed: {reason}")]
    Validation {
        /// Human-readable reason.
        reason: String,
    },

    /// An authoritative endpoint call failed.
    #[error("{endpoint} endpoint failed: {source}")]
    Upstream {
        /// Label of the endpoint that failed.
        endpoint: String,
        /// The underlying failure.
        #[source]
        source: UpstreamError,
    },

    /// The secondary refused a create, so the primary was never written.
    #[error("secondary {endpoint} refused the write: {source}")]
    SecondaryRejected {
        /// Label of the secondary endpoint.
        endpoint: String,
        /// The underlying failure.
        #[source]
        source: UpstreamError,
    },

    /// The primary create failed and the compensating delete on the
    /// secondary failed too. The replicas now disagree; the dangling
    /// intent record stays pending until [`recover`] sweeps it.
    ///
    /// [`recover`]: crate::WriteCoordinator::recover
    #[error(
        "replicas diverged: primary create failed ({primary}) and the \
         compensating delete failed ({compensation})"
    )]
    ConsistencyViolation {
        /// Why the primary create failed.
        primary: UpstreamError,
        /// Why the compensating delete failed.
        compensation: UpstreamError,
    },

    /// Recording the money side effect failed after the endpoint write.
    #[error("ledger append failed: {0}")]
    Ledger(#[from] LedgerError),

    /// The intent journal could not be written or read.
    #[error("intent journal: {0}")]
    Intent(#[from] StoreError),

    /// The actor is not allowed to perform this operation.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// What was missing.
        reason: String,
    },
}

impl CoordinatorError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        CoordinatorError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn upstream(endpoint: impl Into<String>, source: UpstreamError) -> Self {
        CoordinatorError::Upstream {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn secondary_rejected(endpoint: impl Into<String>, source: UpstreamError) -> Self {
        CoordinatorError::SecondaryRejected {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        CoordinatorError::Forbidden {
            reason: reason.into(),
        }
    }
}

/// Convenience alias for coordinator results.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
