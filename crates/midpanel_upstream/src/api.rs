//! Wire types for the middleware API.
//!
//! Every response is a JSON envelope: `{"status": "OK", "error": "",
//! "results": ...}`. The account rows inside are lenient by necessity:
//! middleware deployments disagree on which fields they fill in, and the
//! reseller field arrives as a number, a numeric string, or garbage.

use crate::error::{UpstreamError, UpstreamResult};
use serde::{Deserialize, Deserializer, Serialize};

/// The JSON envelope wrapped around every middleware response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// `"OK"` on success, anything else on failure.
    pub status: String,
    /// The middleware's error text. Usually empty on success.
    #[serde(default)]
    pub error: String,
    /// The payload. Write endpoints often omit it.
    #[serde(default = "none")]
    pub results: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> ApiResponse<T> {
    /// True if the envelope reports success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }

    fn rejection(&self) -> UpstreamError {
        if self.error.is_empty() {
            UpstreamError::rejected(format!("status {}", self.status))
        } else {
            UpstreamError::rejected(self.error.clone())
        }
    }

    /// Unwraps the payload, turning a non-OK status into an error.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Rejected`] for a non-OK status, or
    /// [`UpstreamError::Protocol`] if an OK envelope carries no payload.
    pub fn into_results(self) -> UpstreamResult<T> {
        if !self.is_ok() {
            return Err(self.rejection());
        }
        self.results
            .ok_or_else(|| UpstreamError::protocol("OK response carried no results"))
    }

    /// Checks only the status, for write endpoints with no useful payload.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Rejected`] for a non-OK status.
    pub fn into_ok(self) -> UpstreamResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self.rejection())
        }
    }
}

/// One subscriber row as the middleware reports it.
///
/// Raw and untrusted: the device identifier and handle may be empty, the
/// reseller field may be any JSON type. Validation happens during
/// reconciliation staging, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamAccount {
    /// Device MAC address, possibly empty or malformed.
    #[serde(rename = "mac", default)]
    pub device_id: String,
    /// Display username, possibly empty.
    #[serde(rename = "login", default)]
    pub handle: String,
    /// Subscriber name.
    #[serde(default)]
    pub full_name: String,
    /// Contact phone as entered upstream, any format.
    #[serde(default)]
    pub phone: String,
    /// Contact e-mail.
    #[serde(default)]
    pub email: String,
    /// Tariff plan code.
    #[serde(rename = "tariff_plan", default)]
    pub plan: Option<String>,
    /// Subscription expiry, epoch milliseconds.
    #[serde(rename = "expire_at", default)]
    pub expires_at: Option<u64>,
    /// 1 for enabled, 0 for disabled.
    #[serde(default = "default_status")]
    pub status: i64,
    /// Owning reseller as the middleware knows it. Lenient: accepts a
    /// number or a numeric string; zero, negative and junk become `None`.
    #[serde(
        rename = "reseller",
        default,
        deserialize_with = "lenient_owner",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner: Option<u64>,
}

fn default_status() -> i64 {
    1
}

impl UpstreamAccount {
    /// Creates an enabled row with the given identity, other fields empty.
    pub fn new(device_id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            handle: handle.into(),
            full_name: String::new(),
            phone: String::new(),
            email: String::new(),
            plan: None,
            expires_at: None,
            status: 1,
            owner: None,
        }
    }

    /// True if the middleware reports the account as enabled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == 1
    }
}

fn lenient_owner<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) if n > 0 => u64::try_from(n).ok(),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| u64::try_from(n).ok()),
        _ => None,
    })
}

/// One tariff plan as the middleware reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Tariff code, the panel's plan reference.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in minor currency units.
    #[serde(default)]
    pub price: i64,
    /// Subscription period in days.
    #[serde(default)]
    pub days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_yields_results() {
        let body = r#"{"status":"OK","error":"","results":[{"mac":"00:1A:79:11:22:33","login":"sub001"}]}"#;
        let envelope: ApiResponse<Vec<UpstreamAccount>> = serde_json::from_str(body).unwrap();
        let rows = envelope.into_results().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].device_id, "00:1A:79:11:22:33");
        assert_eq!(rows[0].handle, "sub001");
        assert!(rows[0].is_active());
    }

    #[test]
    fn non_ok_status_becomes_rejection() {
        let body = r#"{"status":"ERROR","error":"Authorization failed"}"#;
        let envelope: ApiResponse<Vec<UpstreamAccount>> = serde_json::from_str(body).unwrap();
        let err = envelope.into_results().unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected { .. }));
        assert!(err.to_string().contains("Authorization failed"));
    }

    #[test]
    fn ok_without_results_is_fine_for_writes() {
        let body = r#"{"status":"OK","error":""}"#;
        let envelope: ApiResponse<Vec<UpstreamAccount>> = serde_json::from_str(body).unwrap();
        envelope.into_ok().unwrap();
    }

    #[test]
    fn owner_accepts_number_and_numeric_string() {
        let row: UpstreamAccount =
            serde_json::from_str(r#"{"mac":"a","login":"b","reseller":5}"#).unwrap();
        assert_eq!(row.owner, Some(5));

        let row: UpstreamAccount =
            serde_json::from_str(r#"{"mac":"a","login":"b","reseller":"7"}"#).unwrap();
        assert_eq!(row.owner, Some(7));
    }

    #[test]
    fn owner_rejects_zero_negative_and_junk() {
        for raw in [
            r#"{"mac":"a","login":"b","reseller":0}"#,
            r#"{"mac":"a","login":"b","reseller":-3}"#,
            r#"{"mac":"a","login":"b","reseller":"0"}"#,
            r#"{"mac":"a","login":"b","reseller":""}"#,
            r#"{"mac":"a","login":"b","reseller":"none"}"#,
            r#"{"mac":"a","login":"b","reseller":null}"#,
            r#"{"mac":"a","login":"b"}"#,
        ] {
            let row: UpstreamAccount = serde_json::from_str(raw).unwrap();
            assert_eq!(row.owner, None, "input: {raw}");
        }
    }

    #[test]
    fn missing_fields_default() {
        let row: UpstreamAccount = serde_json::from_str(r#"{}"#).unwrap();
        assert!(row.device_id.is_empty());
        assert!(row.handle.is_empty());
        assert!(row.is_active());
        assert_eq!(row.plan, None);
    }

    #[test]
    fn plan_parses() {
        let body = r#"{"id":"premium_12m","name":"Premium 12 months","price":30000,"days":365}"#;
        let plan: Plan = serde_json::from_str(body).unwrap();
        assert_eq!(plan.id, "premium_12m");
        assert_eq!(plan.price, 30_000);
        assert_eq!(plan.days, 365);
    }
}
