//! Commercial JSON rate feed (open.er-api.com response shape).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use leufx_common::{Clock, CurrencyCode, Timestamp};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::table::RateTable;

/// Provider ID constant
pub const PROVIDER_ID: &str = "EXCHANGE_API";

/// Default endpoint. `{base}` and `{api_key}` are substituted per request.
pub const DEFAULT_EXCHANGE_API_URL: &str = "https://open.er-api.com/v6/latest/{base}";

/// API response from the rate feed
#[derive(Debug, Deserialize)]
pub struct ExchangeApiResponse {
    /// `"success"` or `"error"`
    pub result: String,
    /// Base currency of `rates`
    pub base_code: Option<String>,
    /// Unix timestamp of the last upstream update
    pub time_last_update_unix: Option<i64>,
    /// Units of each currency per one unit of base
    #[serde(default)]
    pub rates: HashMap<String, f64>,
    /// Error type on failure
    #[serde(rename = "error-type")]
    pub error_type: Option<String>,
}

impl ExchangeApiResponse {
    /// Convert into a table quoted against `base`.
    pub fn into_table(self, base: CurrencyCode, fetched_at: Timestamp) -> FxResult<RateTable> {
        if self.result != "success" {
            let reason = self.error_type.unwrap_or_else(|| self.result.clone());
            return Err(FxError::provider(PROVIDER_ID, reason));
        }

        let response_base = match self.base_code.as_deref() {
            Some(code) => CurrencyCode::parse(code)?,
            None => base,
        };

        let rate_date = self
            .time_last_update_unix
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive());

        let mut table =
            RateTable::new(response_base, fetched_at, PROVIDER_ID).with_rate_date(rate_date);
        for (code, rate) in self.rates {
            let (Ok(code), Some(rate)) = (CurrencyCode::parse(&code), Decimal::from_f64(rate))
            else {
                continue;
            };
            table.insert(code, rate);
        }

        table.rebase(base)
    }
}

/// Secondary live source.
pub struct ExchangeApiProvider {
    client: Client,
    url_template: String,
    api_key: Option<String>,
    clock: Arc<dyn Clock>,
}

impl ExchangeApiProvider {
    /// Create a provider for `url_template`.
    pub fn new(
        url_template: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url_template: url_template.into(),
            api_key,
            clock,
        }
    }

    fn url_for(&self, base: CurrencyCode) -> String {
        self.url_template
            .replace("{base}", base.as_str())
            .replace("{api_key}", self.api_key.as_deref().unwrap_or_default())
    }
}

#[async_trait]
impl RateProvider for ExchangeApiProvider {
    fn name(&self) -> &str {
        PROVIDER_ID
    }

    async fn fetch(&self, base: CurrencyCode) -> FxResult<RateTable> {
        let url = self.url_for(base);
        debug!(base = %base, "Fetching rates from exchange API");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FxError::provider(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            return Err(FxError::provider(
                PROVIDER_ID,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: ExchangeApiResponse = response
            .json()
            .await
            .map_err(|e| FxError::provider(PROVIDER_ID, e))?;

        body.into_table(base, self.clock.now())
    }
}
