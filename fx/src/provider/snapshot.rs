//! Embedded EUR rate snapshot: the last-resort tier of the chain.

use std::sync::Arc;

use async_trait::async_trait;
use leufx_common::{Clock, CurrencyCode};
use rust_decimal::Decimal;

use crate::error::FxResult;
use crate::provider::RateProvider;
use crate::table::RateTable;

/// Provider ID constant
pub const PROVIDER_ID: &str = "SNAPSHOT";

/// Units per EUR, December 2025 reference levels.
const EUR_RATES: &[(&str, i64, u32)] = &[
    ("USD", 10850, 4),
    ("GBP", 8550, 4),
    ("RON", 49750, 4),
    ("PLN", 43200, 4),
    ("CZK", 251500, 4),
    ("HUF", 39550, 2),
    ("BGN", 19558, 4),
    ("CHF", 9450, 4),
    ("SEK", 112500, 4),
    ("NOK", 115800, 4),
    ("DKK", 74600, 4),
    ("JPY", 16250, 2),
    ("CNY", 78500, 4),
    ("AUD", 16550, 4),
    ("CAD", 14750, 4),
    ("TRY", 3250, 2),
    ("RUB", 9850, 2),
    ("INR", 9050, 2),
    ("BRL", 53500, 4),
    ("MXN", 1875, 2),
    ("ZAR", 1985, 2),
    ("SGD", 14550, 4),
    ("HKD", 84500, 4),
    ("KRW", 142500, 2),
    ("NZD", 17850, 4),
    ("AED", 39850, 4),
    ("SAR", 40700, 4),
    ("ILS", 39250, 4),
    ("THB", 3785, 2),
];

/// Static table that always succeeds without I/O.
pub struct StaticSnapshotProvider {
    clock: Arc<dyn Clock>,
}

impl StaticSnapshotProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// The snapshot quoted against `base`, stamped with the current time.
    pub fn table(&self, base: CurrencyCode) -> FxResult<RateTable> {
        let mut table = RateTable::new(CurrencyCode::EUR, self.clock.now(), PROVIDER_ID);
        for (code, mantissa, scale) in EUR_RATES {
            if let Ok(code) = CurrencyCode::parse(code) {
                table.insert(code, Decimal::new(*mantissa, *scale));
            }
        }
        table.rebase(base)
    }
}

#[async_trait]
impl RateProvider for StaticSnapshotProvider {
    fn name(&self) -> &str {
        PROVIDER_ID
    }

    async fn fetch(&self, base: CurrencyCode) -> FxResult<RateTable> {
        self.table(base)
    }
}
