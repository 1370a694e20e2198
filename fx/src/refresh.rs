//! Single-flight refresh of the rate cache.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use leufx_common::CurrencyCode;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::RateCache;
use crate::metrics::EngineMetrics;
use crate::provider::ProviderChain;

/// Result of one pass through the provider chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    /// Whether a new table was committed.
    pub success: bool,
    /// Currencies in the committed table; 0 when nothing was committed.
    pub rates_count: usize,
    /// Provider of the committed table.
    pub source: Option<String>,
}

type RefreshFuture = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Runs the provider chain and commits the result, at most one run at a time.
pub struct Refresher {
    chain: ProviderChain,
    cache: Arc<RateCache>,
    metrics: Arc<EngineMetrics>,
    base: CurrencyCode,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl Refresher {
    pub fn new(
        chain: ProviderChain,
        cache: Arc<RateCache>,
        metrics: Arc<EngineMetrics>,
        base: CurrencyCode,
    ) -> Self {
        Self {
            chain,
            cache,
            metrics,
            base,
            in_flight: Mutex::new(None),
        }
    }

    /// Whether a run is currently in progress.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Start a run, or join the one already in progress.
    ///
    /// The returned future is shared: every caller awaiting it observes the
    /// same outcome and the chain is queried once. Inside a tokio runtime the
    /// run is spawned as its own task, so it completes and frees the slot
    /// even if every caller stops waiting.
    pub fn refresh(self: &Arc<Self>) -> RefreshFuture {
        let mut slot = self.in_flight.lock();
        if let Some(running) = slot.as_ref() {
            self.metrics.refresh_joined();
            debug!("Joining in-flight rate refresh");
            return running.clone();
        }

        let this = Arc::clone(self);
        let work = async move {
            let outcome = this.run_once().await;
            this.in_flight.lock().take();
            outcome
        };

        let run = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn(work);
                let this = Arc::clone(self);
                async move {
                    task.await.unwrap_or_else(|e| {
                        this.in_flight.lock().take();
                        this.metrics.refresh_failed();
                        warn!(error = %e, "Rate refresh task did not finish");
                        RefreshOutcome {
                            success: false,
                            rates_count: 0,
                            source: None,
                        }
                    })
                }
                .boxed()
            }
            Err(_) => work.boxed(),
        }
        .shared();

        *slot = Some(run.clone());
        run
    }

    /// Kick off a run on the current tokio runtime without waiting for it.
    ///
    /// Without a runtime the trigger is dropped; the next read or scheduled
    /// tick retries.
    pub fn trigger_background(self: &Arc<Self>) {
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No async runtime, background refresh skipped");
            return;
        }
        // A run already in flight is a spawned task and finishes on its own.
        if !self.is_in_flight() {
            drop(self.refresh());
        }
    }

    /// Refresh every `interval` until the handle is aborted.
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let outcome = this.refresh().await;
                debug!(success = outcome.success, "Scheduled rate refresh finished");
            }
        })
    }

    async fn run_once(&self) -> RefreshOutcome {
        self.metrics.refresh_started();

        match self.chain.fetch(self.base).await {
            Ok(table) => {
                let rates_count = table.len();
                let source = table.source.clone();
                self.cache.store(table);
                self.metrics.refresh_succeeded();
                info!(source = %source, rates = rates_count, "Rate table refreshed");
                RefreshOutcome {
                    success: true,
                    rates_count,
                    source: Some(source),
                }
            }
            Err(e) => {
                self.metrics.refresh_failed();
                warn!(error = %e, "Rate refresh failed, keeping last known-good table");
                RefreshOutcome {
                    success: false,
                    rates_count: 0,
                    source: None,
                }
            }
        }
    }
}
