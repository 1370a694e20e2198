//! Time-boxed holder of the current rate table.

use std::sync::Arc;

use leufx_common::{is_within_ttl, Clock, Timestamp};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::config::RateCacheConfig;
use crate::table::RateTable;

/// A committed table plus the moment it was stored.
#[derive(Debug, Clone)]
pub struct CachedTable {
    pub table: Arc<RateTable>,
    pub stored_at: Timestamp,
}

/// Read-only view of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    /// Whether the table is younger than the TTL.
    pub is_valid: bool,
    /// Currencies in the current table, base included.
    pub rates_count: usize,
    /// When the current table was stored.
    pub last_update: Option<Timestamp>,
    /// Configured TTL in milliseconds.
    pub ttl_ms: u64,
    /// Provider of the current table.
    pub source: Option<String>,
}

/// Thread-safe single-table cache with TTL.
///
/// Readers get an `Arc` to a complete table; the refresh path swaps the whole
/// entry under the write lock, so no reader sees a partial update.
pub struct RateCache {
    current: RwLock<Option<CachedTable>>,
    config: RateCacheConfig,
    clock: Arc<dyn Clock>,
}

impl RateCache {
    /// Create an empty cache.
    pub fn new(config: RateCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            current: RwLock::new(None),
            config,
            clock,
        }
    }

    /// Current entry, fresh or stale.
    pub fn get(&self) -> Option<CachedTable> {
        self.current.read().clone()
    }

    /// Whether an entry is within the TTL.
    pub fn is_fresh(&self, entry: &CachedTable) -> bool {
        is_within_ttl(entry.stored_at, self.clock.now(), self.config.ttl)
    }

    /// Whether the cache holds a fresh table.
    pub fn is_valid(&self) -> bool {
        self.get().map(|e| self.is_fresh(&e)).unwrap_or(false)
    }

    /// Replace the current table.
    pub fn store(&self, table: RateTable) -> CachedTable {
        let entry = CachedTable {
            table: Arc::new(table),
            stored_at: self.clock.now(),
        };
        *self.current.write() = Some(entry.clone());
        debug!(
            source = %entry.table.source,
            rates = entry.table.len(),
            "Rate table stored"
        );
        entry
    }

    /// Store `table` only if the cache is empty; returns whatever is current.
    pub fn seed(&self, table: RateTable) -> CachedTable {
        let mut current = self.current.write();
        if let Some(existing) = current.as_ref() {
            return existing.clone();
        }
        let entry = CachedTable {
            table: Arc::new(table),
            stored_at: self.clock.now(),
        };
        *current = Some(entry.clone());
        entry
    }

    /// Status view for health checks.
    pub fn status(&self) -> CacheStatus {
        let entry = self.get();
        CacheStatus {
            is_valid: entry.as_ref().map(|e| self.is_fresh(e)).unwrap_or(false),
            rates_count: entry.as_ref().map(|e| e.table.len()).unwrap_or(0),
            last_update: entry.as_ref().map(|e| e.stored_at),
            ttl_ms: u64::try_from(self.config.ttl.as_millis()).unwrap_or(u64::MAX),
            source: entry.map(|e| e.table.source.clone()),
        }
    }
}
