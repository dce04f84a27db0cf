//! Error types for domain validation.

use thiserror::Error;

/// Result type for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while validating domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A device identifier could not be parsed as a MAC address.
    #[error("invalid device identifier: {value:?}")]
    InvalidDeviceId {
        /// The rejected input.
        value: String,
    },

    /// A currency code was not three ASCII letters.
    #[error("invalid currency code: {value:?}")]
    InvalidCurrency {
        /// The rejected input.
        value: String,
    },

    /// A value failed a domain rule.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CoreError {
    /// Creates an `InvalidDeviceId` error.
    pub fn invalid_device_id(value: impl Into<String>) -> Self {
        Self::InvalidDeviceId {
            value: value.into(),
        }
    }

    /// Creates an `InvalidCurrency` error.
    pub fn invalid_currency(value: impl Into<String>) -> Self {
        Self::InvalidCurrency {
            value: value.into(),
        }
    }

    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
