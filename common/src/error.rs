//! Error types for currency identity.

use thiserror::Error;

/// Errors raised while validating currency input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The input is not a three-letter alphabetic code.
    #[error("Invalid currency code: {0}")]
    InvalidCode(String),

    /// The amount could not be parsed as a decimal.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl CurrencyError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CurrencyError::InvalidCode(_) => "INVALID_CURRENCY_CODE",
            CurrencyError::InvalidAmount(_) => "INVALID_AMOUNT",
        }
    }
}
