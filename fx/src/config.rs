//! Engine configuration.

use std::time::Duration;

use leufx_common::constants;

use crate::error::{FxError, FxResult};
use crate::provider::bnr::DEFAULT_BNR_URL;
use crate::provider::exchange_api::DEFAULT_EXCHANGE_API_URL;

/// Configuration for the rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// Age after which the cached table is stale.
    pub ttl: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::DEFAULT_CACHE_TTL,
        }
    }
}

/// Live rate sources.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// BNR XML feed.
    pub bnr_url: String,
    /// JSON feed URL template (`{base}`, `{api_key}` placeholders).
    pub exchange_api_url: String,
    /// Credential for the JSON feed.
    pub exchange_api_key: Option<String>,
    /// Bound on a single provider attempt.
    pub timeout: Duration,
    /// Query BNR first.
    pub enable_bnr: bool,
    /// Query the JSON feed second.
    pub enable_exchange_api: bool,
    /// Fall back to the embedded snapshot.
    pub enable_snapshot: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            bnr_url: DEFAULT_BNR_URL.to_string(),
            exchange_api_url: DEFAULT_EXCHANGE_API_URL.to_string(),
            exchange_api_key: None,
            timeout: constants::DEFAULT_PROVIDER_TIMEOUT,
            enable_bnr: true,
            enable_exchange_api: true,
            enable_snapshot: true,
        }
    }
}

impl ProviderConfig {
    /// Only the embedded snapshot; no network access.
    pub fn offline() -> Self {
        Self {
            enable_bnr: false,
            enable_exchange_api: false,
            ..Self::default()
        }
    }
}

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    /// Cache configuration.
    pub cache: RateCacheConfig,
    /// Provider configuration.
    pub providers: ProviderConfig,
    /// Period of the scheduled refresh task.
    pub refresh_interval: Duration,
}

impl Default for FxEngineConfig {
    fn default() -> Self {
        Self {
            cache: RateCacheConfig::default(),
            providers: ProviderConfig::default(),
            refresh_interval: constants::DEFAULT_CACHE_TTL,
        }
    }
}

impl FxEngineConfig {
    /// Snapshot-only configuration for tests and air-gapped tools.
    pub fn offline() -> Self {
        Self {
            providers: ProviderConfig::offline(),
            ..Self::default()
        }
    }

    /// Set the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ttl) = env_millis("LEUFX_TTL_MS") {
            config.cache.ttl = ttl;
            config.refresh_interval = ttl;
        }

        if let Some(interval) = env_millis("LEUFX_REFRESH_INTERVAL_MS") {
            config.refresh_interval = interval;
        }

        if let Some(timeout) = env_millis("LEUFX_PROVIDER_TIMEOUT_MS") {
            config.providers.timeout = timeout;
        }

        if let Ok(url) = std::env::var("LEUFX_BNR_URL") {
            config.providers.bnr_url = url;
        }

        if let Ok(url) = std::env::var("LEUFX_EXCHANGE_API_URL") {
            config.providers.exchange_api_url = url;
        }

        if let Ok(key) = std::env::var("LEUFX_EXCHANGE_API_KEY") {
            if !key.is_empty() {
                config.providers.exchange_api_key = Some(key);
            }
        }

        if let Ok(offline) = std::env::var("LEUFX_OFFLINE") {
            if matches!(offline.as_str(), "1" | "true" | "yes") {
                config.providers.enable_bnr = false;
                config.providers.enable_exchange_api = false;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if self.cache.ttl.is_zero() {
            return Err(FxError::Config("Cache TTL cannot be 0".to_string()));
        }

        if self.providers.timeout.is_zero() {
            return Err(FxError::Config("Provider timeout cannot be 0".to_string()));
        }

        if self.refresh_interval.is_zero() {
            return Err(FxError::Config("Refresh interval cannot be 0".to_string()));
        }

        let p = &self.providers;
        if !(p.enable_bnr || p.enable_exchange_api || p.enable_snapshot) {
            return Err(FxError::Config("At least one rate provider must be enabled".to_string()));
        }

        if p.enable_bnr && p.bnr_url.is_empty() {
            return Err(FxError::Config("BNR URL cannot be empty".to_string()));
        }

        if p.enable_exchange_api && p.exchange_api_url.is_empty() {
            return Err(FxError::Config("Exchange API URL cannot be empty".to_string()));
        }

        Ok(())
    }

    /// TTL in milliseconds, as reported by cache status.
    pub fn ttl_ms(&self) -> u64 {
        u64::try_from(self.cache.ttl.as_millis()).unwrap_or(u64::MAX)
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
