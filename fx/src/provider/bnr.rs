//! National Bank of Romania (BNR) daily reference rates.
//!
//! BNR publishes an XML document every business day around 13:00 EET. Rates
//! are RON per `multiplier` units of the foreign currency, e.g.
//! `<Rate currency="HUF" multiplier="100">1.3284</Rate>`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use leufx_common::{Clock, CurrencyCode};
use regex::Regex;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::table::RateTable;

/// Provider ID constant
pub const PROVIDER_ID: &str = "BNR";

/// Default feed location.
pub const DEFAULT_BNR_URL: &str = "https://www.bnr.ro/nbrfxrates.xml";

lazy_static! {
    static ref CUBE_DATE: Regex =
        Regex::new(r#"<Cube\s+date="(\d{4}-\d{2}-\d{2})""#).expect("valid cube regex");
    static ref RATE: Regex = Regex::new(
        r#"<Rate\s+currency="([A-Za-z]{3})"(?:\s+multiplier="(\d+)")?\s*>\s*([0-9.]+)\s*</Rate>"#
    )
    .expect("valid rate regex");
}

/// One `<Rate>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct BnrRate {
    pub currency: CurrencyCode,
    pub multiplier: u32,
    pub value: Decimal,
}

impl BnrRate {
    /// RON per single unit of the currency.
    pub fn ron_per_unit(&self) -> Option<Decimal> {
        self.value.checked_div(Decimal::from(self.multiplier))
    }
}

/// Parsed BNR document.
#[derive(Debug, Clone, PartialEq)]
pub struct BnrFixing {
    pub date: Option<NaiveDate>,
    pub rates: Vec<BnrRate>,
}

impl BnrFixing {
    /// Build a table quoted against `base`. RON itself is always part of it.
    pub fn to_table(&self, base: CurrencyCode, fetched_at: leufx_common::Timestamp) -> FxResult<RateTable> {
        let ron_per = |code: CurrencyCode| -> Option<Decimal> {
            if code == CurrencyCode::RON {
                return Some(Decimal::ONE);
            }
            self.rates
                .iter()
                .find(|r| r.currency == code)
                .and_then(BnrRate::ron_per_unit)
        };

        let ron_per_base = ron_per(base)
            .filter(|r| !r.is_zero())
            .ok_or_else(|| FxError::provider(PROVIDER_ID, format!("feed has no {} rate", base)))?;

        let mut table = RateTable::new(base, fetched_at, PROVIDER_ID).with_rate_date(self.date);
        table.insert(CurrencyCode::RON, ron_per_base);
        for rate in &self.rates {
            let Some(per_unit) = rate.ron_per_unit().filter(|r| !r.is_zero()) else {
                continue;
            };
            if let Some(quoted) = ron_per_base.checked_div(per_unit) {
                table.insert(rate.currency, quoted);
            }
        }
        Ok(table)
    }
}

/// Parse the BNR XML document. Malformed `<Rate>` entries are skipped.
pub fn parse_bnr_xml(xml: &str) -> FxResult<BnrFixing> {
    let date = CUBE_DATE
        .captures(xml)
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok());

    let mut rates = Vec::new();
    for caps in RATE.captures_iter(xml) {
        let Ok(currency) = CurrencyCode::parse(&caps[1]) else {
            continue;
        };
        let multiplier = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(1);
        let Ok(value) = caps[3].parse::<Decimal>() else {
            debug!(currency = %currency, raw = &caps[3], "Skipping unparsable BNR rate");
            continue;
        };
        rates.push(BnrRate {
            currency,
            multiplier,
            value,
        });
    }

    if rates.is_empty() {
        return Err(FxError::provider(PROVIDER_ID, "no rates found in document"));
    }

    Ok(BnrFixing { date, rates })
}

/// Primary live source: BNR reference rates over HTTP.
pub struct BnrProvider {
    client: Client,
    url: String,
    clock: Arc<dyn Clock>,
}

impl BnrProvider {
    /// Create a provider reading from `url`.
    pub fn new(url: impl Into<String>, timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
            clock,
        }
    }
}

#[async_trait]
impl RateProvider for BnrProvider {
    fn name(&self) -> &str {
        PROVIDER_ID
    }

    async fn fetch(&self, base: CurrencyCode) -> FxResult<RateTable> {
        debug!(url = %self.url, "Fetching BNR reference rates");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FxError::provider(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(FxError::provider(
                PROVIDER_ID,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FxError::provider(PROVIDER_ID, e))?;

        parse_bnr_xml(&body)?.to_table(base, self.clock.now())
    }
}
