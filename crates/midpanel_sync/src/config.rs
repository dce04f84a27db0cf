//! Engine configuration.

/// Knobs for the reconciliation engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Dialing code (without `+`) applied when normalizing national phone
    /// numbers into mirror rows, e.g. `"971"`. `None` leaves national
    /// numbers as plain digits.
    pub default_country_code: Option<String>,
}

impl EngineConfig {
    /// Configuration with no default country code.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default dialing code.
    #[must_use]
    pub fn with_default_country_code(mut self, code: impl Into<String>) -> Self {
        self.default_country_code = Some(code.into());
        self
    }
}
