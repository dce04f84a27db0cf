//! Reseller records.

use crate::id::ResellerId;
use crate::money::Currency;
use serde::{Deserialize, Serialize};

/// A reseller (owner of subscriber accounts, debtor on the ledger).
///
/// A reseller's balance is not stored here. It is derived from the ledger
/// on every query; see `midpanel_ledger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reseller {
    /// Panel-side identifier.
    pub id: ResellerId,
    /// Display name.
    pub name: String,
    /// Currency all of this reseller's ledger rows are kept in.
    pub currency: Currency,
    /// How far the derived balance may rise before sales are refused.
    /// `None` disables the check.
    pub credit_limit_minor: Option<i64>,
    /// Maximum number of accounts this reseller may own. `None` is
    /// unlimited. Informational; enforced by the operator surface.
    pub max_accounts: Option<u32>,
}

impl Reseller {
    /// Creates a reseller with no credit or account limits.
    pub fn new(id: ResellerId, name: impl Into<String>, currency: Currency) -> Self {
        Self {
            id,
            name: name.into(),
            currency,
            credit_limit_minor: None,
            max_accounts: None,
        }
    }

    /// Sets the credit limit.
    #[must_use]
    pub fn with_credit_limit(mut self, limit_minor: i64) -> Self {
        self.credit_limit_minor = Some(limit_minor);
        self
    }

    /// Sets the maximum account count.
    #[must_use]
    pub fn with_max_accounts(mut self, max: u32) -> Self {
        self.max_accounts = Some(max);
        self
    }
}
