//! Counters for engine health checks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Engine metrics.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Conversions performed.
    pub conversions: AtomicU64,
    /// Refresh runs started (joins excluded).
    pub refresh_attempts: AtomicU64,
    /// Refresh runs that committed a new table.
    pub refresh_success: AtomicU64,
    /// Refresh runs where every provider failed.
    pub refresh_failures: AtomicU64,
    /// Refresh triggers that joined an in-flight run.
    pub refresh_joins: AtomicU64,
    /// Tables served by a provider other than the first.
    pub provider_fallbacks: AtomicU64,
    /// Reads served from a stale table.
    pub stale_reads: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversion(&self) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_started(&self) {
        self.refresh_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_succeeded(&self) {
        self.refresh_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_failed(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_joined(&self) {
        self.refresh_joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_fallback(&self) {
        self.provider_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_read(&self) {
        self.stale_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            conversions: self.conversions.load(Ordering::Relaxed),
            refresh_attempts: self.refresh_attempts.load(Ordering::Relaxed),
            refresh_success: self.refresh_success.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            refresh_joins: self.refresh_joins.load(Ordering::Relaxed),
            provider_fallbacks: self.provider_fallbacks.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub conversions: u64,
    pub refresh_attempts: u64,
    pub refresh_success: u64,
    pub refresh_failures: u64,
    pub refresh_joins: u64,
    pub provider_fallbacks: u64,
    pub stale_reads: u64,
}
