//! FX engine error types.

use leufx_common::{CurrencyCode, CurrencyError};
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Clone, Error)]
pub enum FxError {
    /// A caller referenced a currency that is not registered.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// A caller asked for a rate table in an unregistered base.
    #[error("Unsupported base currency: {0}")]
    UnsupportedBaseCurrency(String),

    /// Malformed currency or amount input.
    #[error(transparent)]
    InvalidInput(#[from] CurrencyError),

    /// The current rate table has no entry for a registered currency.
    #[error("Rate not available for {0}")]
    RateNotAvailable(CurrencyCode),

    /// Provider returned an error.
    #[error("Rate provider {provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    /// Provider did not answer within its time budget.
    #[error("Rate provider {provider} timed out")]
    ProviderTimeout { provider: String },

    /// Every provider in the chain failed.
    #[error("No rate providers available")]
    NoProvidersAvailable,

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FxError {
    /// Shorthand for provider failures.
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        FxError::ProviderError {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Errors caused by caller input rather than by the engine or its feeds.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            FxError::UnsupportedCurrency(_)
                | FxError::UnsupportedBaseCurrency(_)
                | FxError::InvalidInput(_)
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            FxError::UnsupportedBaseCurrency(_) => "UNSUPPORTED_BASE_CURRENCY",
            FxError::InvalidInput(e) => e.error_code(),
            FxError::RateNotAvailable(_) => "RATE_NOT_AVAILABLE",
            FxError::ProviderError { .. } => "PROVIDER_ERROR",
            FxError::ProviderTimeout { .. } => "PROVIDER_TIMEOUT",
            FxError::NoProvidersAvailable => "NO_PROVIDERS_AVAILABLE",
            FxError::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
