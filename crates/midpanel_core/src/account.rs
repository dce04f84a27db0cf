//! Subscriber account records.

use crate::id::{DeviceId, PlanRef, ResellerId};
use serde::{Deserialize, Serialize};

/// A subscriber account as held in the local mirror.
///
/// The mirror copy is disposable: reconciliation rebuilds it wholesale from
/// the upstream list. Only [`Account::device_id`] is stable across rebuilds;
/// ownership is re-resolved on every pass from the assignment mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable hardware identifier (set-top box MAC).
    pub device_id: DeviceId,
    /// Display username on the middleware. Editable upstream, so it is an
    /// attribute here, not a key.
    pub handle: String,
    /// Subscriber full name.
    pub full_name: String,
    /// Contact phone in canonical international form.
    pub phone: String,
    /// Contact e-mail.
    pub email: String,
    /// Upstream tariff plan, if one is assigned.
    pub plan: Option<PlanRef>,
    /// Subscription expiry, epoch milliseconds.
    pub expires_at: Option<u64>,
    /// Whether the account is enabled on the middleware.
    pub active: bool,
    /// Owning reseller, when one could be resolved.
    pub owner: Option<ResellerId>,
    /// When this row was last rebuilt from upstream, epoch milliseconds.
    pub synced_at: u64,
}

/// Payload for creating an account on the middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Hardware identifier of the subscriber device.
    pub device_id: DeviceId,
    /// Desired username.
    pub handle: String,
    /// Subscriber full name.
    pub full_name: String,
    /// Contact phone (raw; normalized before being mirrored).
    pub phone: String,
    /// Contact e-mail.
    pub email: String,
    /// Tariff plan to subscribe to.
    pub plan: Option<PlanRef>,
    /// Reseller that will own the account on the panel side.
    pub owner: Option<ResellerId>,
}

/// Partial update for an existing account. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPatch {
    /// New username.
    pub handle: Option<String>,
    /// New full name.
    pub full_name: Option<String>,
    /// New contact phone.
    pub phone: Option<String>,
    /// New contact e-mail.
    pub email: Option<String>,
    /// New tariff plan.
    pub plan: Option<PlanRef>,
    /// New expiry, epoch milliseconds.
    pub expires_at: Option<u64>,
}

impl AccountPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.plan.is_none()
            && self.expires_at.is_none()
    }

    /// Applies the patch to a mirror row in place.
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(handle) = &self.handle {
            account.handle = handle.clone();
        }
        if let Some(full_name) = &self.full_name {
            account.full_name = full_name.clone();
        }
        if let Some(phone) = &self.phone {
            account.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(plan) = &self.plan {
            account.plan = Some(plan.clone());
        }
        if let Some(expires_at) = self.expires_at {
            account.expires_at = Some(expires_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        Account {
            device_id: DeviceId::parse("00:1A:79:00:00:01").unwrap(),
            handle: "sub001".into(),
            full_name: "First Subscriber".into(),
            phone: "+97150000001".into(),
            email: "sub001@example.net".into(),
            plan: Some(PlanRef::new("gold")),
            expires_at: Some(1_700_000_000_000),
            active: true,
            owner: Some(ResellerId::new(3)),
            synced_at: 1_690_000_000_000,
        }
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut account = sample_account();
        let before = account.clone();

        let patch = AccountPatch::default();
        assert!(patch.is_empty());
        patch.apply_to(&mut account);

        assert_eq!(account, before);
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut account = sample_account();
        let patch = AccountPatch {
            handle: Some("renamed".into()),
            expires_at: Some(1_800_000_000_000),
            ..AccountPatch::default()
        };
        assert!(!patch.is_empty());

        patch.apply_to(&mut account);

        assert_eq!(account.handle, "renamed");
        assert_eq!(account.expires_at, Some(1_800_000_000_000));
        assert_eq!(account.full_name, "First Subscriber");
        assert_eq!(account.plan, Some(PlanRef::new("gold")));
    }
}
