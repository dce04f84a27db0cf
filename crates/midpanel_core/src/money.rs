//! Currency handling.
//!
//! All monetary amounts in the workspace are plain `i64` values in minor
//! units (cents, fils, kopecks). Sales are stored as negative deductions
//! against a reseller; payments are stored positive. Balances are always
//! derived, never stored, so there is no decimal type here.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217 style currency code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Parses a currency code (three ASCII letters).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCurrency`] for anything else.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::invalid_currency(raw));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the uppercase code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_uppercases() {
        let c = Currency::parse("usd").unwrap();
        assert_eq!(c.as_str(), "USD");
        assert_eq!(c, Currency::parse(" USD ").unwrap());
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::parse("").is_err());
        assert!(Currency::parse("US").is_err());
        assert!(Currency::parse("DOLLARS").is_err());
        assert!(Currency::parse("U$D").is_err());
    }
}
