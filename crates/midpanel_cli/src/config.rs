//! Panel configuration file.
//!
//! One JSON document names everything an invocation needs: where the local
//! store lives, how to reach the middleware endpoints, the replication
//! switches, and the operator every mutation is attributed to.
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/midpanel",
//!   "primary": {
//!     "base_url": "https://mw1.example.net/stalker_portal/api",
//!     "username": "panel",
//!     "password": "secret"
//!   },
//!   "secondary": null,
//!   "dual_endpoint_enabled": false,
//!   "delete_on_secondary": false,
//!   "default_country_code": "971",
//!   "operator": { "label": "root", "role": "super_admin" }
//! }
//! ```

use midpanel_core::{Actor, ResellerId, Role};
use midpanel_upstream::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root of the panel configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Directory holding the mirror, ledger, and journals.
    pub data_dir: PathBuf,
    /// The middleware the panel reads from and writes to first or second
    /// per the coordinator's ordering rules.
    pub primary: EndpointSection,
    /// Optional second middleware kept in step on replicated writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<EndpointSection>,
    /// Whether creates replicate to the secondary.
    #[serde(default)]
    pub dual_endpoint_enabled: bool,
    /// Whether deletes propagate to the secondary.
    #[serde(default)]
    pub delete_on_secondary: bool,
    /// Country code prefix for normalizing local phone numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_country_code: Option<String>,
    /// Operator identity every mutation is attributed to.
    pub operator: OperatorSection,
}

/// Connection details for one middleware endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSection {
    /// Base URL, e.g. `https://mw1.example.net/stalker_portal/api`.
    pub base_url: String,
    /// Basic auth username.
    pub username: String,
    /// Basic auth password.
    pub password: String,
}

/// The operator running this invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSection {
    /// Login name recorded in ledger and audit fields.
    pub label: String,
    /// The reseller the operator belongs to. Omit for global admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reseller: Option<u64>,
    /// `super_admin`, `reseller_admin`, or `observer`.
    pub role: Role,
}

impl PanelConfig {
    /// Loads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
        let config: PanelConfig = serde_json::from_str(&raw)
            .map_err(|err| format!("cannot parse {}: {err}", path.display()))?;
        Ok(config)
    }

    /// Resolves the operator into an actor with its capability set.
    pub fn actor(&self) -> Actor {
        Actor::new(
            self.operator.label.clone(),
            self.operator.reseller.map(ResellerId::new),
            self.operator.role,
        )
    }

    /// Endpoint configuration for the primary middleware.
    pub fn primary_endpoint(&self) -> EndpointConfig {
        self.primary.to_endpoint("primary")
    }

    /// Endpoint configuration for the secondary, when one is configured.
    pub fn secondary_endpoint(&self) -> Option<EndpointConfig> {
        self.secondary
            .as_ref()
            .map(|section| section.to_endpoint("secondary"))
    }
}

impl EndpointSection {
    fn to_endpoint(&self, label: &str) -> EndpointConfig {
        EndpointConfig::new(
            self.base_url.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .with_label(label)
    }
}
