//! LeuFX Engine
//!
//! Exchange-rate and conversion engine for a RON/EUR centred business suite.
//!
//! # Features
//!
//! - Ordered provider chain: BNR fixing, a commercial JSON feed, and an
//!   embedded snapshot as the last resort
//! - Single-table cache with TTL, stale-while-revalidate reads and
//!   single-flight refresh
//! - Decimal conversions rounded half-up to each currency's precision
//! - Locale-aware formatting and parsing
//!
//! # Example
//!
//! ```rust,ignore
//! use leufx_fx::{FxEngine, FxEngineConfig};
//! use rust_decimal_macros::dec;
//!
//! let engine = FxEngine::new(FxEngineConfig::from_env())?;
//! let _refresh = engine.spawn_refresh_task();
//!
//! let result = engine.convert(dec!(1000), "EUR", "RON")?;
//! println!("{}", engine.format_ron(result.converted_amount)?);
//! ```

pub mod cache;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod format;
pub mod history;
pub mod metrics;
pub mod provider;
pub mod refresh;
pub mod table;

pub use cache::{CacheStatus, RateCache};
pub use config::{FxEngineConfig, ProviderConfig, RateCacheConfig};
pub use conversion::{
    ConversionResult, ExchangeRate, FromRonConversion, InvoiceRate, MultiCurrencyTotal, RonConversion,
    TotalBreakdown,
};
pub use engine::{FxEngine, FxEngineBuilder, FxEngineStats, BASE_CURRENCY};
pub use error::{FxError, FxResult};
pub use format::{CurrencyFormatter, FormatOptions};
pub use history::HistoricalRate;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use provider::{ProviderChain, RateProvider};
pub use refresh::RefreshOutcome;
pub use table::RateTable;

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
