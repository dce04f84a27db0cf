//! An in-memory middleware double for tests.
//!
//! Behaves like a tiny panel backend: created accounts show up in later
//! listings, patches mutate state, deletes remove it. Individual operations
//! can be forced to fail so callers can exercise their error paths, and
//! every call is recorded for later assertions.

use crate::api::{Plan, UpstreamAccount};
use crate::client::UpstreamClient;
use crate::error::{UpstreamError, UpstreamResult};
use midpanel_core::{AccountPatch, DeviceId, NewAccount};
use parking_lot::Mutex;

/// One recorded invocation against a [`MockUpstream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Account listing.
    List,
    /// Single account fetch by handle.
    Fetch(String),
    /// Account creation, by handle.
    Create(String),
    /// Attribute update.
    Update(DeviceId),
    /// Status toggle.
    SetStatus(DeviceId, bool),
    /// Account deletion.
    Delete(DeviceId),
    /// Device message push.
    Message(DeviceId),
    /// Plan catalogue listing.
    Plans,
}

#[derive(Debug, Default)]
struct Failures {
    list: Option<UpstreamError>,
    fetch: Option<UpstreamError>,
    create: Option<UpstreamError>,
    update: Option<UpstreamError>,
    status: Option<UpstreamError>,
    delete: Option<UpstreamError>,
    plans: Option<UpstreamError>,
    message: Option<UpstreamError>,
}

/// Scriptable [`UpstreamClient`] for tests.
#[derive(Debug, Default)]
pub struct MockUpstream {
    name: String,
    accounts: Mutex<Vec<UpstreamAccount>>,
    plans: Mutex<Vec<Plan>>,
    failures: Mutex<Failures>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockUpstream {
    /// Creates an empty mock named `mock`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "mock".to_owned(),
            ..Self::default()
        }
    }

    /// Names the endpoint, so warnings in assertions can tell primary from
    /// secondary.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Seeds the upstream with existing accounts.
    pub fn seed_accounts(&self, accounts: Vec<UpstreamAccount>) {
        *self.accounts.lock() = accounts;
    }

    /// Seeds the upstream with a plan catalogue.
    pub fn seed_plans(&self, plans: Vec<Plan>) {
        *self.plans.lock() = plans;
    }

    /// Forces the next and all later listings to fail.
    pub fn set_list_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().list = err;
    }

    /// Forces single account fetches to fail.
    pub fn set_fetch_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().fetch = err;
    }

    /// Forces account creation to fail.
    pub fn set_create_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().create = err;
    }

    /// Forces attribute updates to fail.
    pub fn set_update_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().update = err;
    }

    /// Forces status toggles to fail.
    pub fn set_status_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().status = err;
    }

    /// Forces deletions to fail.
    pub fn set_delete_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().delete = err;
    }

    /// Forces plan listings to fail.
    pub fn set_plans_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().plans = err;
    }

    /// Forces message pushes to fail.
    pub fn set_message_error(&self, err: Option<UpstreamError>) {
        self.failures.lock().message = err;
    }

    /// Everything invoked so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Current account state, as a later listing would return it.
    pub fn current_accounts(&self) -> Vec<UpstreamAccount> {
        self.accounts.lock().clone()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }
}

impl UpstreamClient for MockUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_accounts(&self) -> UpstreamResult<Vec<UpstreamAccount>> {
        self.record(MockCall::List);
        if let Some(err) = self.failures.lock().list.clone() {
            return Err(err);
        }
        Ok(self.accounts.lock().clone())
    }

    fn fetch_account(&self, handle: &str) -> UpstreamResult<UpstreamAccount> {
        self.record(MockCall::Fetch(handle.to_owned()));
        if let Some(err) = self.failures.lock().fetch.clone() {
            return Err(err);
        }
        self.accounts
            .lock()
            .iter()
            .find(|a| a.handle == handle)
            .cloned()
            .ok_or_else(|| UpstreamError::rejected(format!("no account with login {handle}")))
    }

    fn create_account(&self, account: &NewAccount) -> UpstreamResult<()> {
        self.record(MockCall::Create(account.handle.clone()));
        if let Some(err) = self.failures.lock().create.clone() {
            return Err(err);
        }
        let mut row = UpstreamAccount::new(account.device_id.as_str(), &account.handle);
        row.full_name = account.full_name.clone();
        row.phone = account.phone.clone();
        row.email = account.email.clone();
        row.plan = account.plan.as_ref().map(|p| p.as_str().to_owned());
        row.owner = account.owner.map(|o| o.as_u64());
        self.accounts.lock().push(row);
        Ok(())
    }

    fn update_account(&self, device: &DeviceId, patch: &AccountPatch) -> UpstreamResult<()> {
        self.record(MockCall::Update(device.clone()));
        if let Some(err) = self.failures.lock().update.clone() {
            return Err(err);
        }
        let mut accounts = self.accounts.lock();
        let row = accounts
            .iter_mut()
            .find(|a| a.device_id == device.as_str())
            .ok_or_else(|| UpstreamError::rejected(format!("no account with mac {device}")))?;
        if let Some(handle) = &patch.handle {
            row.handle = handle.clone();
        }
        if let Some(full_name) = &patch.full_name {
            row.full_name = full_name.clone();
        }
        if let Some(phone) = &patch.phone {
            row.phone = phone.clone();
        }
        if let Some(email) = &patch.email {
            row.email = email.clone();
        }
        if let Some(plan) = &patch.plan {
            row.plan = Some(plan.as_str().to_owned());
        }
        if let Some(expires_at) = patch.expires_at {
            row.expires_at = Some(expires_at);
        }
        Ok(())
    }

    fn set_status(&self, device: &DeviceId, active: bool) -> UpstreamResult<()> {
        self.record(MockCall::SetStatus(device.clone(), active));
        if let Some(err) = self.failures.lock().status.clone() {
            return Err(err);
        }
        let mut accounts = self.accounts.lock();
        let row = accounts
            .iter_mut()
            .find(|a| a.device_id == device.as_str())
            .ok_or_else(|| UpstreamError::rejected(format!("no account with mac {device}")))?;
        row.status = i64::from(active);
        Ok(())
    }

    fn delete_account(&self, device: &DeviceId) -> UpstreamResult<()> {
        self.record(MockCall::Delete(device.clone()));
        if let Some(err) = self.failures.lock().delete.clone() {
            return Err(err);
        }
        let mut accounts = self.accounts.lock();
        let before = accounts.len();
        accounts.retain(|a| a.device_id != device.as_str());
        if accounts.len() == before {
            return Err(UpstreamError::rejected(format!(
                "no account with mac {device}"
            )));
        }
        Ok(())
    }

    fn list_plans(&self) -> UpstreamResult<Vec<Plan>> {
        self.record(MockCall::Plans);
        if let Some(err) = self.failures.lock().plans.clone() {
            return Err(err);
        }
        Ok(self.plans.lock().clone())
    }

    fn send_message(&self, device: &DeviceId, _message: &str) -> UpstreamResult<()> {
        self.record(MockCall::Message(device.clone()));
        if let Some(err) = self.failures.lock().message.clone() {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(handle: &str, mac: &str) -> NewAccount {
        NewAccount {
            device_id: DeviceId::parse(mac).unwrap(),
            handle: handle.to_owned(),
            full_name: String::new(),
            phone: String::new(),
            email: String::new(),
            plan: None,
            owner: None,
        }
    }

    #[test]
    fn created_accounts_show_up_in_listings() {
        let mock = MockUpstream::new();
        mock.create_account(&new_account("sub001", "00:1A:79:00:00:01"))
            .unwrap();

        let listed = mock.list_accounts().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].handle, "sub001");
        assert_eq!(listed[0].device_id, "00:1A:79:00:00:01");
    }

    #[test]
    fn delete_removes_and_rejects_unknown() {
        let mock = MockUpstream::new();
        let device = DeviceId::parse("00:1A:79:00:00:01").unwrap();
        mock.create_account(&new_account("sub001", "00:1A:79:00:00:01"))
            .unwrap();

        mock.delete_account(&device).unwrap();
        assert!(mock.list_accounts().unwrap().is_empty());
        assert!(matches!(
            mock.delete_account(&device),
            Err(UpstreamError::Rejected { .. })
        ));
    }

    #[test]
    fn forced_failure_is_returned_and_recorded() {
        let mock = MockUpstream::new();
        mock.set_create_error(Some(UpstreamError::unavailable("down for maintenance")));

        let result = mock.create_account(&new_account("sub001", "00:1A:79:00:00:01"));
        assert!(matches!(result, Err(UpstreamError::Unavailable { .. })));
        assert_eq!(mock.calls(), vec![MockCall::Create("sub001".to_owned())]);
        assert!(mock.current_accounts().is_empty());
    }

    #[test]
    fn patch_updates_only_named_fields() {
        let mock = MockUpstream::new();
        let device = DeviceId::parse("00:1A:79:00:00:01").unwrap();
        let mut account = new_account("sub001", "00:1A:79:00:00:01");
        account.full_name = "Original Name".to_owned();
        mock.create_account(&account).unwrap();

        let patch = AccountPatch {
            phone: Some("+97150000009".to_owned()),
            ..AccountPatch::default()
        };
        mock.update_account(&device, &patch).unwrap();

        let row = mock.fetch_account("sub001").unwrap();
        assert_eq!(row.phone, "+97150000009");
        assert_eq!(row.full_name, "Original Name");
    }

    #[test]
    fn status_toggle_flips_activity() {
        let mock = MockUpstream::new();
        let device = DeviceId::parse("00:1A:79:00:00:01").unwrap();
        mock.create_account(&new_account("sub001", "00:1A:79:00:00:01"))
            .unwrap();

        mock.set_status(&device, false).unwrap();
        assert!(!mock.fetch_account("sub001").unwrap().is_active());
        mock.set_status(&device, true).unwrap();
        assert!(mock.fetch_account("sub001").unwrap().is_active());
    }
}
