//! The client trait the rest of the panel programs against.

use crate::api::{Plan, UpstreamAccount};
use crate::error::UpstreamResult;
use midpanel_core::{AccountPatch, DeviceId, NewAccount};

/// Operations against one middleware endpoint.
///
/// Implementations must be safe to share across threads: the coordinator
/// and the reconciliation engine hold the same client behind an `Arc`.
pub trait UpstreamClient: Send + Sync {
    /// Label for log lines, typically `primary` or `secondary`.
    fn name(&self) -> &str;

    /// Fetches the full subscriber list in one bulk read.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, rejection, or an
    /// unparsable body.
    fn list_accounts(&self) -> UpstreamResult<Vec<UpstreamAccount>>;

    /// Fetches one subscriber by display handle.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the handle is unknown upstream.
    fn fetch_account(&self, handle: &str) -> UpstreamResult<UpstreamAccount>;

    /// Creates a subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the middleware refuses the create.
    fn create_account(&self, account: &NewAccount) -> UpstreamResult<()>;

    /// Updates subscriber attributes by device identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown or the write fails.
    fn update_account(&self, device: &DeviceId, patch: &AccountPatch) -> UpstreamResult<()>;

    /// Enables or disables a subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown or the write fails.
    fn set_status(&self, device: &DeviceId, active: bool) -> UpstreamResult<()>;

    /// Deletes a subscriber by device identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown or the delete fails.
    fn delete_account(&self, device: &DeviceId) -> UpstreamResult<()>;

    /// Lists the tariff plans the middleware offers.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or rejection.
    fn list_plans(&self) -> UpstreamResult<Vec<Plan>>;

    /// Pushes a status message to a subscriber's device.
    ///
    /// # Errors
    ///
    /// Returns an error if the middleware refuses the message.
    fn send_message(&self, device: &DeviceId, message: &str) -> UpstreamResult<()>;
}
