//! The real middleware client over HTTP.

use crate::api::{ApiResponse, Plan, UpstreamAccount};
use crate::client::UpstreamClient;
use crate::config::EndpointConfig;
use crate::error::{UpstreamError, UpstreamResult};
use midpanel_core::{AccountPatch, DeviceId, NewAccount};
use reqwest::blocking::{Client, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::warn;

/// Blocking HTTP implementation of [`UpstreamClient`].
///
/// Carries the configured connect/request deadlines on every call and a
/// bounded retry on reads. Writes go out exactly once.
pub struct HttpUpstream {
    config: EndpointConfig,
    client: Client,
}

impl HttpUpstream {
    /// Builds a client for one endpoint.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: EndpointConfig) -> UpstreamResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| UpstreamError::protocol(format!("building http client: {err}")))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_transport_error(err: &reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::timeout(err.to_string())
        } else if err.is_decode() {
            UpstreamError::protocol(err.to_string())
        } else {
            UpstreamError::unavailable(err.to_string())
        }
    }

    fn check_http_status(response: Response) -> UpstreamResult<Response> {
        let status = response.status();
        if status.is_server_error() {
            Err(UpstreamError::unavailable(format!("HTTP {status}")))
        } else if !status.is_success() {
            Err(UpstreamError::rejected(format!("HTTP {status}")))
        } else {
            Ok(response)
        }
    }

    fn parse_results<T: DeserializeOwned>(response: Response) -> UpstreamResult<T> {
        let response = Self::check_http_status(response)?;
        let envelope: ApiResponse<T> = response
            .json()
            .map_err(|err| UpstreamError::protocol(format!("unparsable body: {err}")))?;
        envelope.into_results()
    }

    fn parse_status_only(response: Response) -> UpstreamResult<()> {
        let response = Self::check_http_status(response)?;
        let envelope: ApiResponse<IgnoredAny> = response
            .json()
            .map_err(|err| UpstreamError::protocol(format!("unparsable body: {err}")))?;
        envelope.into_ok()
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> UpstreamResult<T> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            let delay = retry.delay_for_attempt(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            let result = self
                .client
                .get(self.url(path))
                .basic_auth(&self.config.username, Some(&self.config.password))
                .send()
                .map_err(|err| Self::map_transport_error(&err))
                .and_then(Self::parse_results);

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < retry.max_attempts => {
                    warn!(
                        endpoint = %self.config.label,
                        path,
                        attempt,
                        error = %err,
                        "upstream read failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn post_form(&self, path: &str, form: &[(&str, String)]) -> UpstreamResult<()> {
        let response = self
            .client
            .post(self.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .form(form)
            .send()
            .map_err(|err| Self::map_transport_error(&err))?;
        Self::parse_status_only(response)
    }

    fn put_form(&self, path: &str, form: &[(&str, String)]) -> UpstreamResult<()> {
        let response = self
            .client
            .put(self.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .form(form)
            .send()
            .map_err(|err| Self::map_transport_error(&err))?;
        Self::parse_status_only(response)
    }

    fn delete(&self, path: &str) -> UpstreamResult<()> {
        let response = self
            .client
            .delete(self.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .map_err(|err| Self::map_transport_error(&err))?;
        Self::parse_status_only(response)
    }

    fn create_form(account: &NewAccount) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("mac", account.device_id.as_str().to_owned()),
            ("login", account.handle.clone()),
            ("full_name", account.full_name.clone()),
            ("phone", account.phone.clone()),
            ("email", account.email.clone()),
        ];
        if let Some(plan) = &account.plan {
            form.push(("tariff_plan", plan.as_str().to_owned()));
        }
        if let Some(owner) = account.owner {
            form.push(("reseller", owner.as_u64().to_string()));
        }
        form
    }

    fn patch_form(patch: &AccountPatch) -> Vec<(&'static str, String)> {
        let mut form = Vec::new();
        if let Some(handle) = &patch.handle {
            form.push(("login", handle.clone()));
        }
        if let Some(full_name) = &patch.full_name {
            form.push(("full_name", full_name.clone()));
        }
        if let Some(phone) = &patch.phone {
            form.push(("phone", phone.clone()));
        }
        if let Some(email) = &patch.email {
            form.push(("email", email.clone()));
        }
        if let Some(plan) = &patch.plan {
            form.push(("tariff_plan", plan.as_str().to_owned()));
        }
        if let Some(expires_at) = patch.expires_at {
            form.push(("expire_at", expires_at.to_string()));
        }
        form
    }
}

impl UpstreamClient for HttpUpstream {
    fn name(&self) -> &str {
        &self.config.label
    }

    fn list_accounts(&self) -> UpstreamResult<Vec<UpstreamAccount>> {
        self.get("/accounts")
    }

    fn fetch_account(&self, handle: &str) -> UpstreamResult<UpstreamAccount> {
        self.get(&format!("/accounts/{handle}"))
    }

    fn create_account(&self, account: &NewAccount) -> UpstreamResult<()> {
        self.post_form("/accounts", &Self::create_form(account))
    }

    fn update_account(&self, device: &DeviceId, patch: &AccountPatch) -> UpstreamResult<()> {
        self.put_form(
            &format!("/accounts/{}", device.as_str()),
            &Self::patch_form(patch),
        )
    }

    fn set_status(&self, device: &DeviceId, active: bool) -> UpstreamResult<()> {
        let flag = if active { "1" } else { "0" };
        self.put_form(
            &format!("/accounts/{}/status", device.as_str()),
            &[("status", flag.to_owned())],
        )
    }

    fn delete_account(&self, device: &DeviceId) -> UpstreamResult<()> {
        self.delete(&format!("/accounts/{}", device.as_str()))
    }

    fn list_plans(&self) -> UpstreamResult<Vec<Plan>> {
        self.get("/tariffs")
    }

    fn send_message(&self, device: &DeviceId, message: &str) -> UpstreamResult<()> {
        self.post_form(
            "/stb_msg",
            &[
                ("mac", device.as_str().to_owned()),
                ("msg", message.to_owned()),
            ],
        )
    }
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("label", &self.config.label)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}
