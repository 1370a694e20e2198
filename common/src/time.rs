//! Time utilities and constants for LeuFX.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;

/// Engine timing constants.
pub mod constants {
    use std::time::Duration;

    /// Default rate cache time-to-live (1 hour).
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

    /// Default bound on a single provider attempt (10 seconds).
    pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default length of a synthesized rate history, in days.
    pub const DEFAULT_HISTORY_DAYS: u32 = 30;

    /// Longest synthesized rate history, in days.
    pub const MAX_HISTORY_DAYS: u32 = 3660;
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Source of the current time.
///
/// Injected into the cache and providers so staleness can be driven
/// deterministically in tests.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Timestamp;

    /// Current UTC calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Start at the given instant.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to an exact instant.
    pub fn set(&self, to: Timestamp) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// Whether `stored_at` is younger than `ttl` at `now`.
pub fn is_within_ttl(stored_at: Timestamp, now: Timestamp, ttl: std::time::Duration) -> bool {
    match Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(stored_at) < ttl,
        // A TTL too large for chrono never expires.
        Err(_) => true,
    }
}
