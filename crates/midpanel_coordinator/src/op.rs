//! Write operations and their outcomes.

use crate::charge::Charge;
use midpanel_core::{AccountPatch, DeviceId, EventId, NewAccount};

/// One account mutation to apply across the configured endpoints.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create a subscriber account, optionally billing a charge.
    Create {
        /// The account to create.
        account: NewAccount,
        /// Price to bill the owning reseller, if any.
        charge: Option<Charge>,
    },
    /// Patch an existing account, optionally billing a charge (renewal).
    Update {
        /// Device the account is keyed by.
        device: DeviceId,
        /// Fields to change.
        patch: AccountPatch,
        /// Price to bill the owning reseller, if any.
        charge: Option<Charge>,
    },
    /// Enable or disable an account.
    SetStatus {
        /// Device the account is keyed by.
        device: DeviceId,
        /// `true` enables, `false` disables.
        active: bool,
    },
    /// Delete an account. Keyed by handle; the device identifier is
    /// resolved from the primary before anything is deleted.
    Delete {
        /// Middleware login of the account to delete.
        handle: String,
    },
}

impl WriteOp {
    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            WriteOp::Create { .. } => "create",
            WriteOp::Update { .. } => "update",
            WriteOp::SetStatus { .. } => "set-status",
            WriteOp::Delete { .. } => "delete",
        }
    }
}

/// A non-fatal secondary failure on a best-effort path.
///
/// The write as a whole succeeded on the primary; the named replica is now
/// behind until the next reconciliation or manual retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaWarning {
    /// Label of the endpoint that fell behind.
    pub endpoint: String,
    /// What went wrong, human readable.
    pub message: String,
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    /// The device the mutation landed on. For deletes this is the
    /// identifier resolved from the primary.
    pub device: Option<DeviceId>,
    /// Sale appended for the attached charge, when there was one.
    pub ledger_event: Option<EventId>,
    /// Best-effort secondary failures. Empty when every configured
    /// endpoint took the write.
    pub warnings: Vec<ReplicaWarning>,
}

impl WriteOutcome {
    pub(crate) fn clean(device: DeviceId) -> Self {
        Self {
            device: Some(device),
            ledger_event: None,
            warnings: Vec::new(),
        }
    }

    /// Whether every configured endpoint accepted the write.
    #[must_use]
    pub fn fully_replicated(&self) -> bool {
        self.warnings.is_empty()
    }
}
