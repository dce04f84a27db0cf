//! Coordinator configuration.

/// Switches governing how writes fan out across endpoints.
///
/// Both replication flags default to off: a fresh deployment writes to the
/// primary alone until dual writes are deliberately enabled.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Consult the secondary endpoint at all. Without this flag the
    /// secondary is ignored even when one is configured.
    pub dual_endpoint_enabled: bool,
    /// Propagate deletes to the secondary. Off by default so a botched
    /// delete can still be recovered from the replica.
    pub delete_on_secondary: bool,
    /// Dialing code (without `+`) used to normalize national phone numbers
    /// in mirror rows, e.g. `"971"`. `None` leaves national numbers as
    /// digits.
    pub default_country_code: Option<String>,
}

impl CoordinatorConfig {
    /// Configuration with both replication switches off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dual_endpoint_enabled: false,
            delete_on_secondary: false,
            default_country_code: None,
        }
    }

    /// Enables or disables dual-endpoint writes.
    #[must_use]
    pub fn with_dual_endpoint(mut self, enabled: bool) -> Self {
        self.dual_endpoint_enabled = enabled;
        self
    }

    /// Enables or disables delete propagation to the secondary.
    #[must_use]
    pub fn with_delete_on_secondary(mut self, enabled: bool) -> Self {
        self.delete_on_secondary = enabled;
        self
    }

    /// Sets the default dialing code for phone normalization.
    #[must_use]
    pub fn with_default_country_code(mut self, code: impl Into<String>) -> Self {
        self.default_country_code = Some(code.into());
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
