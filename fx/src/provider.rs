//! Rate provider trait, the ordered provider chain and built-in providers.

pub mod bnr;
pub mod exchange_api;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leufx_common::{CurrencyCode, CurrencyRegistry};
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};
use crate::metrics::EngineMetrics;
use crate::table::RateTable;

pub use bnr::BnrProvider;
pub use exchange_api::ExchangeApiProvider;
pub use snapshot::StaticSnapshotProvider;

/// Trait for exchange-rate sources.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provider identifier, recorded as the table source.
    fn name(&self) -> &str;

    /// Fetch a full table of rates quoted against `base`.
    async fn fetch(&self, base: CurrencyCode) -> FxResult<RateTable>;
}

/// Ordered list of providers, tried until the first usable table.
pub struct ProviderChain {
    providers: Vec<Arc<dyn RateProvider>>,
    registry: Arc<CurrencyRegistry>,
    timeout: Duration,
    metrics: Arc<EngineMetrics>,
}

impl ProviderChain {
    /// Create a chain over `providers`, highest priority first.
    pub fn new(providers: Vec<Arc<dyn RateProvider>>, registry: Arc<CurrencyRegistry>) -> Self {
        Self {
            providers,
            registry,
            timeout: leufx_common::constants::DEFAULT_PROVIDER_TIMEOUT,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Bound each provider attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Report fallbacks into shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Number of configured providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run the chain once. Provider failures are logged and fall through;
    /// only total failure is returned.
    pub async fn fetch(&self, base: CurrencyCode) -> FxResult<RateTable> {
        for (index, provider) in self.providers.iter().enumerate() {
            let attempt = tokio::time::timeout(self.timeout, provider.fetch(base)).await;

            let outcome = match attempt {
                Ok(Ok(table)) => self.accept(table, base),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(FxError::ProviderTimeout {
                    provider: provider.name().to_string(),
                }),
            };

            match outcome {
                Ok(table) => {
                    if index > 0 {
                        self.metrics.provider_fallback();
                    }
                    debug!(
                        provider = provider.name(),
                        rates = table.len(),
                        "Provider returned rate table"
                    );
                    return Ok(table);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        base = %base,
                        error = %e,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        Err(FxError::NoProvidersAvailable)
    }

    /// Normalize a provider table to the requested base and the registry.
    fn accept(&self, table: RateTable, base: CurrencyCode) -> FxResult<RateTable> {
        let source = table.source.clone();
        let mut table = table.rebase(base)?;
        let dropped = table.retain_registered(&self.registry);
        if dropped > 0 {
            debug!(provider = %source, dropped, "Dropped unregistered or invalid rates");
        }
        if table.is_empty() {
            return Err(FxError::provider(source, "table has no usable rates"));
        }
        Ok(table)
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    table: parking_lot::Mutex<Option<RateTable>>,
    delay: Option<Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a provider that fails until a table is set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: parking_lot::Mutex::new(None),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Serve this table (re-stamped with the provider name).
    pub fn with_table(self, mut table: RateTable) -> Self {
        table.source = self.name.clone();
        *self.table.lock() = Some(table);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the served table; `None` makes the provider fail.
    pub fn set_table(&self, table: Option<RateTable>) {
        *self.table.lock() = table.map(|mut t| {
            t.source = self.name.clone();
            t
        });
    }

    /// Number of fetches issued against this provider.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, base: CurrencyCode) -> FxResult<RateTable> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let table = self.table.lock().clone();
        match table {
            Some(table) => table.rebase(base),
            None => Err(FxError::provider(self.name.clone(), "mock failure")),
        }
    }
}
