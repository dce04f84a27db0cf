//! Money attached to a write.

use crate::error::{CoordinatorError, CoordinatorResult};
use midpanel_core::{Currency, Reseller};
use serde::{Deserialize, Serialize};

/// The price side of a create or renewal.
///
/// A charge is validated in full before any endpoint is contacted, and on
/// success becomes one sale event against the owning reseller. The amount
/// lands on the ledger negated, as a deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    /// Plan price in minor units, before discount.
    pub price_minor: i64,
    /// Discount in minor units, subtracted from the price.
    pub discount_minor: i64,
    /// Currency the amounts are denominated in. Must match the owning
    /// reseller's ledger currency.
    pub currency: Currency,
    /// Free-text description carried onto the ledger event.
    pub description: String,
}

impl Charge {
    /// Creates an undiscounted charge.
    pub fn new(price_minor: i64, currency: Currency, description: impl Into<String>) -> Self {
        Self {
            price_minor,
            discount_minor: 0,
            currency,
            description: description.into(),
        }
    }

    /// Sets the discount.
    #[must_use]
    pub fn with_discount(mut self, discount_minor: i64) -> Self {
        self.discount_minor = discount_minor;
        self
    }

    /// Amount actually owed: price minus discount.
    #[must_use]
    pub fn net_minor(&self) -> i64 {
        self.price_minor - self.discount_minor
    }

    /// Checks the charge against the reseller it will be billed to.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative price, a discount outside
    /// `0..=price`, or a currency that differs from the reseller's.
    pub fn validate(&self, reseller: &Reseller) -> CoordinatorResult<()> {
        if self.price_minor < 0 {
            return Err(CoordinatorError::validation("charge price cannot be negative"));
        }
        if self.discount_minor < 0 {
            return Err(CoordinatorError::validation("discount cannot be negative"));
        }
        if self.discount_minor > self.price_minor {
            return Err(CoordinatorError::validation(format!(
                "discount {} exceeds price {}",
                self.discount_minor, self.price_minor
            )));
        }
        if self.currency != reseller.currency {
            return Err(CoordinatorError::validation(format!(
                "charge currency {} does not match {} ledger currency {}",
                self.currency, reseller.name, reseller.currency
            )));
        }
        Ok(())
    }
}
