//! Base-denominated rate tables.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use leufx_common::{CurrencyCode, CurrencyRegistry, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{FxError, FxResult};

/// Units of each currency per one unit of `base`, as delivered by one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    /// Currency every rate is quoted against.
    pub base: CurrencyCode,
    /// Units of the keyed currency per one unit of `base`. Always holds `base -> 1`.
    pub rates: BTreeMap<CurrencyCode, Decimal>,
    /// When the provider produced this table.
    pub fetched_at: Timestamp,
    /// Publication date of the fixing, when the source reports one.
    pub rate_date: Option<NaiveDate>,
    /// Provider that produced the table.
    pub source: String,
}

impl RateTable {
    /// Create an empty table holding only `base -> 1`.
    pub fn new(base: CurrencyCode, fetched_at: Timestamp, source: impl Into<String>) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(base, Decimal::ONE);
        Self {
            base,
            rates,
            fetched_at,
            rate_date: None,
            source: source.into(),
        }
    }

    /// Set the publication date.
    pub fn with_rate_date(mut self, date: Option<NaiveDate>) -> Self {
        self.rate_date = date;
        self
    }

    /// Insert a rate. The base entry stays pinned to one.
    pub fn insert(&mut self, code: CurrencyCode, rate: Decimal) {
        if code != self.base {
            self.rates.insert(code, rate);
        }
    }

    /// Rate of `code` against the base.
    pub fn rate(&self, code: CurrencyCode) -> Option<Decimal> {
        self.rates.get(&code).copied()
    }

    /// Cross-rate: units of `to` per one unit of `from`.
    pub fn cross_rate(&self, from: CurrencyCode, to: CurrencyCode) -> FxResult<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let from_rate = self.rate(from).ok_or(FxError::RateNotAvailable(from))?;
        let to_rate = self.rate(to).ok_or(FxError::RateNotAvailable(to))?;
        to_rate
            .checked_div(from_rate)
            .ok_or(FxError::RateNotAvailable(from))
    }

    /// Re-express the table against another base present in it.
    pub fn rebase(&self, base: CurrencyCode) -> FxResult<RateTable> {
        if base == self.base {
            return Ok(self.clone());
        }
        let pivot = self.rate(base).ok_or(FxError::RateNotAvailable(base))?;

        let mut table = RateTable::new(base, self.fetched_at, self.source.clone())
            .with_rate_date(self.rate_date);
        for (code, rate) in &self.rates {
            if let Some(rebased) = rate.checked_div(pivot) {
                table.insert(*code, rebased);
            }
        }
        Ok(table)
    }

    /// Keep only registered currencies with strictly positive rates.
    ///
    /// Returns the number of entries dropped.
    pub fn retain_registered(&mut self, registry: &CurrencyRegistry) -> usize {
        let before = self.rates.len();
        let base = self.base;
        self.rates
            .retain(|code, rate| *code == base || (registry.contains(*code) && *rate > Decimal::ZERO));
        before - self.rates.len()
    }

    /// Number of currencies in the table, base included.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the table holds nothing beyond its base.
    pub fn is_empty(&self) -> bool {
        self.rates.len() <= 1
    }
}
