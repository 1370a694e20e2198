//! Main FX engine implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use leufx_common::{
    constants, normalize, round_half_up, Clock, CurrencyCode, CurrencyError, CurrencyInfo,
    CurrencyRegistry, Money, SystemClock,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::cache::{CacheStatus, RateCache};
use crate::config::FxEngineConfig;
use crate::conversion::{
    ConversionResult, ExchangeRate, FromRonConversion, InvoiceRate, MultiCurrencyTotal, RonConversion,
    TotalBreakdown,
};
use crate::error::{FxError, FxResult};
use crate::format::{CurrencyFormatter, FormatOptions};
use crate::history::{self, HistoricalRate};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::provider::{
    bnr, BnrProvider, ExchangeApiProvider, ProviderChain, RateProvider, StaticSnapshotProvider,
};
use crate::refresh::{RefreshOutcome, Refresher};
use crate::table::RateTable;

/// Currency every cached table is quoted against.
pub const BASE_CURRENCY: CurrencyCode = CurrencyCode::EUR;

/// Source reported for same-currency rates, which never touch the cache.
pub const IDENTITY_SOURCE: &str = "IDENTITY";

/// Builder for [`FxEngine`].
#[derive(Default)]
pub struct FxEngineBuilder {
    config: Option<FxEngineConfig>,
    registry: Option<Arc<CurrencyRegistry>>,
    providers: Option<Vec<Arc<dyn RateProvider>>>,
    clock: Option<Arc<dyn Clock>>,
}

impl FxEngineBuilder {
    /// Defaults to [`FxEngineConfig::default`].
    pub fn config(mut self, config: FxEngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Defaults to [`CurrencyRegistry::standard`].
    pub fn registry(mut self, registry: Arc<CurrencyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the configured chain with these providers, highest priority first.
    pub fn providers(mut self, providers: Vec<Arc<dyn RateProvider>>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and assemble the engine.
    pub fn build(self) -> FxResult<FxEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CurrencyRegistry::standard()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let providers = self
            .providers
            .unwrap_or_else(|| standard_providers(&config, clock.clone()));
        if providers.is_empty() {
            return Err(FxError::Config("Provider chain is empty".to_string()));
        }

        let metrics = Arc::new(EngineMetrics::new());
        let cache = Arc::new(RateCache::new(config.cache.clone(), clock.clone()));
        let chain = ProviderChain::new(providers, registry.clone())
            .with_timeout(config.providers.timeout)
            .with_metrics(metrics.clone());
        let provider_names = chain.provider_names();
        let refresher = Arc::new(Refresher::new(
            chain,
            cache.clone(),
            metrics.clone(),
            BASE_CURRENCY,
        ));

        info!(
            providers = ?provider_names,
            ttl_ms = config.ttl_ms(),
            currencies = registry.len(),
            "FX engine initialized"
        );

        Ok(FxEngine {
            inner: Arc::new(EngineInner {
                formatter: CurrencyFormatter::new(registry.clone()),
                snapshot: StaticSnapshotProvider::new(clock.clone()),
                config,
                registry,
                cache,
                refresher,
                metrics,
                clock,
                provider_names,
            }),
        })
    }
}

/// Providers enabled by `config`, in chain order.
pub fn standard_providers(config: &FxEngineConfig, clock: Arc<dyn Clock>) -> Vec<Arc<dyn RateProvider>> {
    let p = &config.providers;
    let mut providers: Vec<Arc<dyn RateProvider>> = Vec::with_capacity(3);

    if p.enable_bnr {
        providers.push(Arc::new(BnrProvider::new(
            p.bnr_url.clone(),
            p.timeout,
            clock.clone(),
        )));
    }
    if p.enable_exchange_api {
        providers.push(Arc::new(ExchangeApiProvider::new(
            p.exchange_api_url.clone(),
            p.exchange_api_key.clone(),
            p.timeout,
            clock.clone(),
        )));
    }
    if p.enable_snapshot {
        providers.push(Arc::new(StaticSnapshotProvider::new(clock)));
    }

    providers
}

struct EngineInner {
    config: FxEngineConfig,
    registry: Arc<CurrencyRegistry>,
    cache: Arc<RateCache>,
    refresher: Arc<Refresher>,
    snapshot: StaticSnapshotProvider,
    formatter: CurrencyFormatter,
    metrics: Arc<EngineMetrics>,
    clock: Arc<dyn Clock>,
    provider_names: Vec<String>,
}

/// The exchange-rate and conversion service.
///
/// Cheap to clone; clones share the cache, the refresh coordinator and the
/// metrics. Reads never wait on the network: they use whatever table is
/// cached, stale or not, and stale reads schedule a background refresh.
#[derive(Clone)]
pub struct FxEngine {
    inner: Arc<EngineInner>,
}

impl FxEngine {
    /// Builder with every part defaulted.
    pub fn builder() -> FxEngineBuilder {
        FxEngineBuilder::default()
    }

    /// Engine with the standard registry, the chain described by `config`
    /// and the system clock.
    pub fn new(config: FxEngineConfig) -> FxResult<Self> {
        Self::builder().config(config).build()
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &FxEngineConfig {
        &self.inner.config
    }

    /// Registered currencies.
    pub fn registry(&self) -> &CurrencyRegistry {
        &self.inner.registry
    }

    /// Point-in-time copy of the counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    // Registry

    /// Every registered currency in registry order.
    pub fn supported_currencies(&self) -> Vec<&CurrencyInfo> {
        self.inner.registry.supported_currencies()
    }

    /// Case-insensitive lookup; `None` for unknown codes.
    pub fn get_currency(&self, code: &str) -> Option<&CurrencyInfo> {
        self.inner.registry.get(code)
    }

    /// Lookup by ISO 3166-1 alpha-2 code or country name.
    pub fn get_currency_by_country(&self, country: &str) -> Option<&CurrencyInfo> {
        self.inner.registry.get_by_country(country)
    }

    /// Whether `code`, after trimming and uppercasing, is registered.
    pub fn is_currency_supported(&self, code: &str) -> bool {
        self.inner.registry.is_supported(code)
    }

    fn resolve(&self, code: &str) -> FxResult<&CurrencyInfo> {
        self.inner
            .registry
            .get(code)
            .ok_or_else(|| FxError::UnsupportedCurrency(normalize(code)))
    }

    fn resolve_code(&self, code: CurrencyCode) -> FxResult<&CurrencyInfo> {
        self.inner
            .registry
            .get_by_code(code)
            .ok_or_else(|| FxError::UnsupportedCurrency(code.to_string()))
    }

    // Rates

    /// The table to read from. Never waits on a provider.
    fn current_table(&self) -> FxResult<Arc<RateTable>> {
        let inner = &self.inner;

        if let Some(entry) = inner.cache.get() {
            if !inner.cache.is_fresh(&entry) {
                inner.metrics.stale_read();
                debug!(source = %entry.table.source, "Serving stale rate table");
                inner.refresher.trigger_background();
            }
            return Ok(entry.table);
        }

        let mut seed = inner.snapshot.table(BASE_CURRENCY)?;
        seed.retain_registered(&inner.registry);
        let entry = inner.cache.seed(seed);
        debug!(source = %entry.table.source, "Rate cache seeded from snapshot");
        inner.refresher.trigger_background();
        Ok(entry.table)
    }

    fn quote(&self, from: CurrencyCode, to: CurrencyCode, table: &RateTable) -> FxResult<ExchangeRate> {
        Ok(ExchangeRate {
            from,
            to,
            rate: table.cross_rate(from, to)?,
            timestamp: table.fetched_at,
            source: table.source.clone(),
        })
    }

    fn identity(&self, code: CurrencyCode) -> ExchangeRate {
        ExchangeRate {
            from: code,
            to: code,
            rate: Decimal::ONE,
            timestamp: self.inner.clock.now(),
            source: IDENTITY_SOURCE.to_string(),
        }
    }

    /// Units of `to` per one unit of `from`.
    ///
    /// Both codes are validated before the cache is read; a same-currency
    /// request is answered with exactly 1 without reading it at all.
    #[instrument(level = "debug", skip(self))]
    pub fn get_exchange_rate(&self, from: &str, to: &str) -> FxResult<ExchangeRate> {
        let from = self.resolve(from)?.code;
        let to = self.resolve(to)?.code;

        if from == to {
            return Ok(self.identity(from));
        }

        let table = self.current_table()?;
        self.quote(from, to, &table)
    }

    /// Every cached rate relative to the base currency.
    pub fn get_all_rates(&self) -> FxResult<BTreeMap<CurrencyCode, ExchangeRate>> {
        let table = self.current_table()?;
        table
            .rates
            .keys()
            .map(|code| {
                self.quote(BASE_CURRENCY, *code, &table)
                    .map(|rate| (*code, rate))
            })
            .collect()
    }

    /// The cached table re-expressed against `base`.
    pub fn get_rates_for_base(&self, base: &str) -> FxResult<BTreeMap<CurrencyCode, Decimal>> {
        let base = self
            .inner
            .registry
            .get(base)
            .ok_or_else(|| FxError::UnsupportedBaseCurrency(normalize(base)))?
            .code;

        let table = self.current_table()?;
        Ok(table.rebase(base)?.rates)
    }

    // Conversion

    fn convert_with(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: &CurrencyInfo,
        table: Option<&RateTable>,
    ) -> FxResult<ConversionResult> {
        let rate = match table {
            _ if from == to.code => self.identity(from),
            Some(table) => self.quote(from, to.code, table)?,
            None => self.quote(from, to.code, self.current_table()?.as_ref())?,
        };

        let converted = amount
            .checked_mul(rate.rate)
            .map(|value| round_half_up(value, to.decimals))
            .ok_or_else(|| CurrencyError::InvalidAmount(format!("{amount} {from} overflows in {}", to.code)))?;

        self.inner.metrics.conversion();
        Ok(ConversionResult::new(amount, &rate, converted))
    }

    /// Convert `amount` and round to the target currency's decimals.
    #[instrument(level = "debug", skip(self))]
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> FxResult<ConversionResult> {
        let from = self.resolve(from)?.code;
        let to = self.resolve(to)?;
        let result = self.convert_with(amount, from, to, None)?;

        debug!(
            conversion_id = %result.id,
            converted = %result.converted_amount,
            rate = %result.rate,
            "Conversion completed"
        );
        Ok(result)
    }

    /// Convert a [`Money`] value.
    pub fn convert_money(&self, money: &Money, to: &str) -> FxResult<ConversionResult> {
        let from = self.resolve_code(money.currency)?.code;
        let to = self.resolve(to)?;
        self.convert_with(money.amount, from, to, None)
    }

    /// One result per target, all computed from the same table.
    #[instrument(level = "debug", skip(self, targets), fields(targets = targets.len()))]
    pub fn convert_to_multiple(
        &self,
        amount: Decimal,
        from: &str,
        targets: &[&str],
    ) -> FxResult<Vec<ConversionResult>> {
        let from = self.resolve(from)?.code;
        let targets = targets
            .iter()
            .map(|code| self.resolve(code))
            .collect::<FxResult<Vec<_>>>()?;

        let table = self.current_table()?;
        targets
            .into_iter()
            .map(|to| self.convert_with(amount, from, to, Some(table.as_ref())))
            .collect()
    }

    /// `amount` of `base` expressed in every cached currency.
    ///
    /// The entry for `base` is `amount` itself, unrounded; the others are
    /// rounded to their own decimals.
    pub fn get_equivalent_amounts(
        &self,
        amount: Decimal,
        base: &str,
    ) -> FxResult<BTreeMap<CurrencyCode, Decimal>> {
        let base = self.resolve(base)?.code;
        let table = self.current_table()?;

        let mut result = BTreeMap::new();
        for info in self.inner.registry.supported_currencies() {
            if info.code == base {
                result.insert(base, amount);
                continue;
            }
            let Ok(rate) = table.cross_rate(base, info.code) else {
                continue;
            };
            if let Some(value) = amount.checked_mul(rate) {
                result.insert(info.code, round_half_up(value, info.decimals));
            }
        }
        Ok(result)
    }

    /// Convert and sum mixed-currency items into `target`.
    ///
    /// The total is the exact sum of the converted items rounded once, so
    /// same-currency items add up to their arithmetic sum. Breakdown lines
    /// carry per-item rounded amounts.
    #[instrument(level = "debug", skip(self, items), fields(items = items.len()))]
    pub fn calculate_multi_currency_total(
        &self,
        items: &[Money],
        target: &str,
    ) -> FxResult<MultiCurrencyTotal> {
        let target = self.resolve(target)?;
        let sources = items
            .iter()
            .map(|item| self.resolve_code(item.currency).map(|info| info.code))
            .collect::<FxResult<Vec<_>>>()?;

        let needs_table = sources.iter().any(|code| *code != target.code);
        let table = if needs_table {
            Some(self.current_table()?)
        } else {
            None
        };

        let mut total = Decimal::ZERO;
        let mut breakdown = Vec::with_capacity(items.len());
        for (item, from) in items.iter().zip(sources) {
            let converted = self.convert_with(item.amount, from, target, table.as_deref())?;
            total = item
                .amount
                .checked_mul(converted.rate)
                .and_then(|exact| total.checked_add(exact))
                .ok_or_else(|| CurrencyError::InvalidAmount(format!("total overflows after {item}")))?;
            breakdown.push(TotalBreakdown {
                original_amount: item.amount,
                original_currency: from,
                converted_amount: converted.converted_amount,
                rate: converted.rate,
            });
        }

        Ok(MultiCurrencyTotal {
            currency: target.code,
            total: round_half_up(total, target.decimals),
            breakdown,
        })
    }

    /// Half-up rounding to the currency's decimals.
    pub fn round_to_currency(&self, amount: Decimal, currency: &str) -> FxResult<Decimal> {
        Ok(round_half_up(amount, self.resolve(currency)?.decimals))
    }

    // Invoicing

    /// RON per unit of `currency` from the current table, for invoices.
    pub fn get_rate_for_invoice(&self, currency: &str) -> FxResult<InvoiceRate> {
        let code = self.resolve(currency)?.code;
        let table = self.current_table()?;

        Ok(InvoiceRate {
            currency: code,
            rate: table.cross_rate(code, CurrencyCode::RON)?,
            rate_date: fixing_date(&table),
            source: table.source.clone(),
            is_official: is_official(&table),
        })
    }

    /// Convert to RON and report the fixing used.
    #[instrument(level = "debug", skip(self))]
    pub fn convert_to_ron(&self, amount: Decimal, from: &str) -> FxResult<RonConversion> {
        let from = self.resolve(from)?.code;
        let ron = self.resolve_code(CurrencyCode::RON)?;
        let table = self.current_table()?;
        let result = self.convert_with(amount, from, ron, Some(table.as_ref()))?;

        Ok(RonConversion {
            ron_amount: result.converted_amount,
            rate: result.rate,
            rate_date: fixing_date(&table),
            source: table.source.clone(),
            is_official: is_official(&table),
        })
    }

    /// Convert a RON amount into `to` at the RON fixing, rounded to `to`'s
    /// decimals.
    #[instrument(level = "debug", skip(self))]
    pub fn convert_from_ron(&self, ron_amount: Decimal, to: &str) -> FxResult<FromRonConversion> {
        let to = self.resolve(to)?;
        let table = self.current_table()?;
        let rate = if to.code == CurrencyCode::RON {
            Decimal::ONE
        } else {
            table.cross_rate(to.code, CurrencyCode::RON)?
        };

        let amount = ron_amount
            .checked_div(rate)
            .map(|value| round_half_up(value, to.decimals))
            .ok_or_else(|| CurrencyError::InvalidAmount(format!("{ron_amount} RON cannot be expressed in {}", to.code)))?;

        self.inner.metrics.conversion();
        Ok(FromRonConversion {
            currency: to.code,
            amount,
            rate,
            rate_date: fixing_date(&table),
            source: table.source.clone(),
            is_official: is_official(&table),
        })
    }

    // Cache and refresh

    /// Validity, size and age of the cached table.
    pub fn get_cache_status(&self) -> CacheStatus {
        self.inner.cache.status()
    }

    /// Run the provider chain now, or join the run already in flight.
    ///
    /// Failure is reported in the outcome and leaves the cache untouched.
    pub async fn force_refresh(&self) -> RefreshOutcome {
        info!("Forced rate refresh requested");
        self.inner.refresher.refresh().await
    }

    /// Replace the cached table with the embedded snapshot. No I/O.
    pub fn load_fallback_rates(&self) -> FxResult<RefreshOutcome> {
        let mut table = self.inner.snapshot.table(BASE_CURRENCY)?;
        table.retain_registered(&self.inner.registry);
        let entry = self.inner.cache.store(table);

        info!(rates = entry.table.len(), "Loaded fallback rates");
        Ok(RefreshOutcome {
            success: true,
            rates_count: entry.table.len(),
            source: Some(entry.table.source.clone()),
        })
    }

    /// Start the scheduled refresh loop at the configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_refresh_task(&self) -> JoinHandle<()> {
        let interval = self.inner.config.refresh_interval;
        info!(interval_ms = interval.as_millis() as u64, "Starting scheduled rate refresh");
        self.inner.refresher.spawn_periodic(interval)
    }

    /// Cache status, counters and chain order.
    pub fn stats(&self) -> FxEngineStats {
        FxEngineStats {
            cache: self.inner.cache.status(),
            metrics: self.inner.metrics.snapshot(),
            providers: self.inner.provider_names.clone(),
        }
    }

    // Formatting

    /// Format `amount` in `currency` per `options`.
    pub fn format_currency(
        &self,
        amount: Decimal,
        currency: &str,
        options: &FormatOptions,
    ) -> FxResult<String> {
        self.inner.formatter.format_currency(amount, currency, options)
    }

    /// Romanian formatting, e.g. `1.234,56 lei`.
    pub fn format_ron(&self, amount: Decimal) -> FxResult<String> {
        self.inner.formatter.format_ron(amount)
    }

    /// German formatting, e.g. `1.234,56 €`.
    pub fn format_eur(&self, amount: Decimal) -> FxResult<String> {
        self.inner.formatter.format_eur(amount)
    }

    /// Read locale-formatted text as an amount of `currency`.
    pub fn parse_amount(&self, text: &str, currency: &str, locale: &str) -> FxResult<Decimal> {
        self.inner.formatter.parse_amount(text, currency, locale)
    }

    // History

    /// Synthetic daily series ending today at the current rate.
    ///
    /// `days` defaults to 30, giving 31 points, and may not exceed
    /// [`constants::MAX_HISTORY_DAYS`].
    pub fn get_historical_rates(
        &self,
        from: &str,
        to: &str,
        days: Option<u32>,
    ) -> FxResult<Vec<HistoricalRate>> {
        let days = days.unwrap_or(constants::DEFAULT_HISTORY_DAYS);
        if days > constants::MAX_HISTORY_DAYS {
            return Err(CurrencyError::InvalidAmount(format!(
                "history of {days} days exceeds {} days",
                constants::MAX_HISTORY_DAYS
            ))
            .into());
        }
        let current = self.get_exchange_rate(from, to)?;
        Ok(history::synthesize(
            current.rate,
            current.from,
            current.to,
            self.inner.clock.today(),
            days,
        ))
    }
}

fn fixing_date(table: &RateTable) -> NaiveDate {
    table.rate_date.unwrap_or_else(|| table.fetched_at.date_naive())
}

fn is_official(table: &RateTable) -> bool {
    table.source == bnr::PROVIDER_ID
}

/// Engine statistics.
#[derive(Debug, Clone, Serialize)]
pub struct FxEngineStats {
    pub cache: CacheStatus,
    pub metrics: MetricsSnapshot,
    /// Chain order.
    pub providers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockRateProvider;
    use chrono::Utc;
    use leufx_common::ManualClock;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn offline_engine() -> FxEngine {
        FxEngine::builder()
            .config(FxEngineConfig::offline())
            .clock(Arc::new(ManualClock::starting_now()))
            .build()
            .unwrap()
    }

    fn live_table() -> RateTable {
        let mut table = RateTable::new(CurrencyCode::EUR, Utc::now(), "unused");
        table.insert(CurrencyCode::RON, dec!(5));
        table.insert(CurrencyCode::USD, dec!(1.25));
        table
    }

    fn engine_with(provider: Arc<MockRateProvider>, clock: Arc<ManualClock>) -> FxEngine {
        FxEngine::builder()
            .config(FxEngineConfig::offline())
            .providers(vec![provider as Arc<dyn RateProvider>])
            .clock(clock)
            .build()
            .unwrap()
    }

    async fn wait_until(mut done: impl FnMut() -> bool, what: &str) {
        for _ in 0..100 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {what}");
    }

    async fn wait_for_source(engine: &FxEngine, source: &str) {
        for _ in 0..100 {
            if engine.get_cache_status().source.as_deref() == Some(source) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cache never switched to {source}");
    }

    #[test]
    fn test_identity_rate_for_every_currency() {
        let engine = offline_engine();
        for info in engine.supported_currencies() {
            let rate = engine.get_exchange_rate(info.code.as_str(), info.code.as_str()).unwrap();
            assert_eq!(rate.rate, Decimal::ONE);
            assert_eq!(rate.source, IDENTITY_SOURCE);
        }
        // Identity never reads the cache.
        assert_eq!(engine.get_cache_status().rates_count, 0);
    }

    #[test]
    fn test_reciprocal_rates() {
        let engine = offline_engine();
        engine.load_fallback_rates().unwrap();
        let codes = engine.registry().codes();

        for a in &codes {
            for b in &codes {
                let ab = engine.get_exchange_rate(a.as_str(), b.as_str()).unwrap().rate;
                let ba = engine.get_exchange_rate(b.as_str(), a.as_str()).unwrap().rate;
                assert!((ab * ba - Decimal::ONE).abs() < dec!(0.0001), "{a}/{b}");
            }
        }
    }

    #[test]
    fn test_currency_lookup_is_case_insensitive() {
        let engine = offline_engine();

        assert_eq!(engine.get_currency("eur"), engine.get_currency("EUR"));
        assert!(engine.get_currency(" eur ").is_some());
        assert!(engine.get_currency("XYZ").is_none());
        assert_eq!(engine.get_currency_by_country("ro").unwrap().code, CurrencyCode::RON);
        assert_eq!(engine.get_currency_by_country("DE").unwrap().code, CurrencyCode::EUR);

        for info in engine.supported_currencies() {
            assert!(engine.is_currency_supported(&info.code.as_str().to_lowercase()));
        }
        assert!(!engine.is_currency_supported("xyz"));
    }

    #[test]
    fn test_convert_edge_amounts() {
        let engine = offline_engine();

        let zero = engine.convert(Decimal::ZERO, "EUR", "RON").unwrap();
        assert_eq!(zero.converted_amount, Decimal::ZERO);

        let negative = engine.convert(dec!(-100), "EUR", "RON").unwrap();
        assert!(negative.converted_amount < Decimal::ZERO);
        assert_eq!(negative.converted_amount, dec!(-497.50));

        let large = engine.convert(dec!(1000000000), "EUR", "RON").unwrap();
        assert_eq!(large.converted_amount, dec!(4975000000.00));

        let tiny = engine.convert(dec!(0.001), "EUR", "USD").unwrap();
        assert_eq!(tiny.converted_amount, Decimal::ZERO);
    }

    #[test]
    fn test_convert_same_currency() {
        let engine = offline_engine();
        let result = engine.convert(dec!(100), "EUR", "eur").unwrap();

        assert_eq!(result.converted_amount, dec!(100));
        assert_eq!(result.rate, Decimal::ONE);
        assert_eq!(engine.get_cache_status().rates_count, 0);
    }

    #[test]
    fn test_unsupported_currency_fails_before_cache() {
        let engine = offline_engine();

        let err = engine.convert(dec!(1), "EUR", "xyz").unwrap_err();
        assert!(matches!(&err, FxError::UnsupportedCurrency(code) if code == "XYZ"));
        assert!(err.to_string().contains("Unsupported currency: XYZ"));
        assert!(err.is_caller_error());

        assert!(engine.get_exchange_rate("ABCD", "EUR").is_err());
        assert_eq!(engine.get_cache_status().rates_count, 0);
    }

    #[test]
    fn test_round_to_currency() {
        let engine = offline_engine();

        assert_eq!(engine.round_to_currency(dec!(123.456789), "EUR").unwrap(), dec!(123.46));
        assert_eq!(engine.round_to_currency(dec!(123.456789), "JPY").unwrap(), dec!(123));
        assert_eq!(engine.round_to_currency(dec!(12345.678), "HUF").unwrap(), dec!(12346));
        assert_eq!(engine.round_to_currency(dec!(0.125), "USD").unwrap(), dec!(0.13));
        assert!(engine.round_to_currency(dec!(1), "XYZ").is_err());
    }

    #[test]
    fn test_historical_rates_length() {
        let engine = offline_engine();

        assert_eq!(engine.get_historical_rates("EUR", "RON", Some(7)).unwrap().len(), 8);

        let series = engine.get_historical_rates("EUR", "RON", None).unwrap();
        assert_eq!(series.len(), 31);
        assert!(series.iter().all(|p| p.rate > Decimal::ZERO));
        assert!(series.iter().all(|p| p.from == CurrencyCode::EUR && p.to == CurrencyCode::RON));
        assert_eq!(series.last().unwrap().rate, dec!(4.975));

        assert!(engine.get_historical_rates("EUR", "XYZ", None).is_err());
    }

    #[test]
    fn test_historical_rates_span_is_capped() {
        let engine = offline_engine();
        let max = constants::MAX_HISTORY_DAYS;

        assert_eq!(engine.get_historical_rates("EUR", "RON", Some(max)).unwrap().len(), max as usize + 1);

        let err = engine.get_historical_rates("EUR", "RON", Some(100_000_000)).unwrap_err();
        assert!(err.is_caller_error());
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_rates_for_unsupported_base() {
        let engine = offline_engine();
        let err = engine.get_rates_for_base("xyz").unwrap_err();

        assert!(matches!(err, FxError::UnsupportedBaseCurrency(_)));
        assert!(err.to_string().contains("Unsupported base currency: XYZ"));
    }

    #[test]
    fn test_rates_for_base() {
        let engine = offline_engine();
        let rates = engine.get_rates_for_base("RON").unwrap();

        assert_eq!(rates[&CurrencyCode::RON], Decimal::ONE);
        assert!((rates[&CurrencyCode::EUR] * dec!(4.975) - Decimal::ONE).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_all_rates_relative_to_eur() {
        let engine = offline_engine();
        let rates = engine.get_all_rates().unwrap();

        assert_eq!(rates[&CurrencyCode::EUR].rate, Decimal::ONE);
        assert_eq!(rates[&CurrencyCode::USD].rate, dec!(1.085));
        assert!(rates.values().all(|r| r.from == CurrencyCode::EUR));
    }

    #[test]
    fn test_fallback_rates_make_cache_valid() {
        let engine = offline_engine();
        let outcome = engine.load_fallback_rates().unwrap();
        let status = engine.get_cache_status();

        assert!(outcome.success);
        assert!(status.is_valid);
        assert!(status.rates_count > 10);
        assert_eq!(status.rates_count, outcome.rates_count);
        assert_eq!(status.ttl_ms, 3_600_000);
    }

    #[test]
    fn test_multi_currency_total_same_currency() {
        let engine = offline_engine();
        let items = [
            Money::new(dec!(100), CurrencyCode::EUR),
            Money::new(dec!(200), CurrencyCode::EUR),
            Money::new(dec!(50), CurrencyCode::EUR),
        ];

        let total = engine.calculate_multi_currency_total(&items, "EUR").unwrap();

        assert_eq!(total.total, dec!(350));
        assert_eq!(total.breakdown.len(), 3);
        assert!(total.breakdown.iter().all(|b| b.rate == Decimal::ONE));
    }

    #[test]
    fn test_multi_currency_total_mixed() {
        let engine = offline_engine();
        let items = [
            Money::new(dec!(100), CurrencyCode::EUR),
            Money::new(dec!(497.50), CurrencyCode::RON),
        ];

        let total = engine.calculate_multi_currency_total(&items, "RON").unwrap();

        assert_eq!(total.currency, CurrencyCode::RON);
        assert_eq!(total.total, dec!(995.00));
        assert_eq!(total.breakdown[0].converted_amount, dec!(497.50));
    }

    #[test]
    fn test_multi_currency_total_sums_before_rounding() {
        let engine = offline_engine();
        let items = vec![Money::new(dec!(0.004), CurrencyCode::EUR); 1000];

        let total = engine.calculate_multi_currency_total(&items, "EUR").unwrap();

        assert_eq!(total.total, dec!(4.00));
        assert!(total.breakdown.iter().all(|b| b.converted_amount == Decimal::ZERO));
    }

    #[test]
    fn test_multi_currency_total_overflow_is_an_error() {
        let engine = offline_engine();
        let half = Decimal::MAX / dec!(2) + Decimal::ONE;
        let items = [
            Money::new(half, CurrencyCode::EUR),
            Money::new(half, CurrencyCode::EUR),
        ];

        let err = engine.calculate_multi_currency_total(&items, "EUR").unwrap_err();
        assert!(matches!(err, FxError::InvalidInput(CurrencyError::InvalidAmount(_))));
    }

    #[test]
    fn test_multi_currency_total_rejects_unregistered() {
        let engine = offline_engine();
        let items = [Money::new(dec!(1), CurrencyCode::parse("XYZ").unwrap())];

        let err = engine.calculate_multi_currency_total(&items, "EUR").unwrap_err();
        assert!(matches!(err, FxError::UnsupportedCurrency(_)));
    }

    #[test]
    fn test_convert_to_multiple() {
        let engine = offline_engine();
        let results = engine
            .convert_to_multiple(dec!(10), "EUR", &["RON", "USD", "JPY"])
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.original_amount == dec!(10)));
        assert!(results.iter().all(|r| r.from_currency == CurrencyCode::EUR));
        assert_eq!(results[2].converted_amount, dec!(1625));

        assert!(engine.convert_to_multiple(dec!(10), "EUR", &["RON", "XYZ"]).is_err());
    }

    #[test]
    fn test_equivalent_amounts_keep_base_exact() {
        let engine = offline_engine();
        let amounts = engine.get_equivalent_amounts(dec!(123.456), "eur").unwrap();

        assert_eq!(amounts[&CurrencyCode::EUR], dec!(123.456));
        assert_eq!(amounts[&CurrencyCode::RON], dec!(614.19));
        assert_eq!(amounts[&CurrencyCode::JPY], dec!(20062));
        assert_eq!(amounts.len(), engine.registry().len());
    }

    #[test]
    fn test_format_through_engine() {
        let engine = offline_engine();
        let text = engine
            .format_currency(dec!(1234.56), "EUR", &FormatOptions::for_locale("de-DE"))
            .unwrap();

        assert!(text.contains('€'));
        assert!(text.contains("1.234,56"));
        assert_eq!(engine.format_ron(dec!(10)).unwrap(), "10,00\u{a0}lei");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FxEngineConfig::offline().with_ttl(Duration::ZERO);
        assert!(matches!(FxEngine::new(config), Err(FxError::Config(_))));

        let empty = FxEngine::builder()
            .config(FxEngineConfig::offline())
            .providers(Vec::new())
            .build();
        assert!(matches!(empty, Err(FxError::Config(_))));
    }

    #[tokio::test]
    async fn test_invoice_rate_and_ron_conversion() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(MockRateProvider::new(bnr::PROVIDER_ID).with_table(live_table()));
        let engine = engine_with(provider, clock);

        assert!(engine.force_refresh().await.success);

        let invoice = engine.get_rate_for_invoice("usd").unwrap();
        assert_eq!(invoice.rate, dec!(4));
        assert!(invoice.is_official);

        let ron = engine.get_rate_for_invoice("RON").unwrap();
        assert_eq!(ron.rate, Decimal::ONE);

        let converted = engine.convert_to_ron(dec!(12.34), "EUR").unwrap();
        assert_eq!(converted.ron_amount, dec!(61.70));
        assert_eq!(converted.source, bnr::PROVIDER_ID);
        assert!(converted.is_official);
    }

    #[tokio::test]
    async fn test_convert_from_ron() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(MockRateProvider::new(bnr::PROVIDER_ID).with_table(live_table()));
        let engine = engine_with(provider, clock);
        assert!(engine.force_refresh().await.success);

        let usd = engine.convert_from_ron(dec!(100), "usd").unwrap();
        assert_eq!(usd.currency, CurrencyCode::USD);
        assert_eq!(usd.amount, dec!(25.00));
        assert_eq!(usd.rate, dec!(4));
        assert_eq!(usd.source, bnr::PROVIDER_ID);
        assert!(usd.is_official);

        let eur = engine.convert_from_ron(dec!(0.01), "EUR").unwrap();
        assert_eq!(eur.amount, Decimal::ZERO);

        let ron = engine.convert_from_ron(dec!(12.345), "RON").unwrap();
        assert_eq!(ron.amount, dec!(12.35));
        assert_eq!(ron.rate, Decimal::ONE);

        assert!(matches!(
            engine.convert_from_ron(dec!(1), "XYZ"),
            Err(FxError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_convert_from_ron_on_snapshot_is_not_official() {
        let engine = offline_engine();
        engine.load_fallback_rates().unwrap();

        let eur = engine.convert_from_ron(dec!(497.50), "EUR").unwrap();
        assert_eq!(eur.amount, dec!(100.00));
        assert_eq!(eur.rate, dec!(4.975));
        assert!(!eur.is_official);
    }

    #[tokio::test]
    async fn test_snapshot_rates_are_not_official() {
        let engine = offline_engine();
        engine.load_fallback_rates().unwrap();

        let invoice = engine.get_rate_for_invoice("EUR").unwrap();
        assert_eq!(invoice.rate, dec!(4.975));
        assert!(!invoice.is_official);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_table() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(MockRateProvider::new("down"));
        let engine = engine_with(provider, clock);
        engine.load_fallback_rates().unwrap();

        let outcome = engine.force_refresh().await;

        assert!(!outcome.success);
        assert_eq!(outcome.rates_count, 0);
        assert_eq!(engine.get_cache_status().source.as_deref(), Some("SNAPSHOT"));
        assert_eq!(engine.convert(dec!(1), "EUR", "RON").unwrap().rate, dec!(4.975));
    }

    #[tokio::test]
    async fn test_empty_cache_seeds_then_refreshes() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(
            MockRateProvider::new("live")
                .with_table(live_table())
                .with_delay(Duration::from_millis(20)),
        );
        let engine = engine_with(provider.clone(), clock);

        let first = engine.convert(dec!(1), "EUR", "RON").unwrap();
        assert_eq!(first.source, "SNAPSHOT");

        wait_for_source(&engine, "live").await;
        assert_eq!(engine.convert(dec!(1), "EUR", "RON").unwrap().rate, dec!(5));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_read_serves_old_table_and_refreshes() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(
            MockRateProvider::new("live")
                .with_table(live_table())
                .with_delay(Duration::from_millis(20)),
        );
        let engine = engine_with(provider.clone(), clock.clone());
        engine.load_fallback_rates().unwrap();

        clock.advance(chrono::Duration::hours(2));
        assert!(!engine.get_cache_status().is_valid);

        let stale = engine.convert(dec!(1), "EUR", "RON").unwrap();
        assert_eq!(stale.rate, dec!(4.975));
        assert_eq!(engine.metrics().stale_reads, 1);

        wait_for_source(&engine, "live").await;
        assert!(engine.get_cache_status().is_valid);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_force_refresh_does_not_block_later_refreshes() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(
            MockRateProvider::new("live")
                .with_table(live_table())
                .with_delay(Duration::from_millis(50)),
        );
        let engine = engine_with(provider.clone(), clock.clone());
        engine.load_fallback_rates().unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(5), engine.force_refresh()).await;
        assert!(abandoned.is_err());

        // The abandoned run still completes on its own.
        wait_for_source(&engine, "live").await;
        assert_eq!(provider.calls(), 1);

        clock.advance(chrono::Duration::hours(2));
        for _ in 0..5 {
            engine.convert(dec!(1), "EUR", "RON").unwrap();
        }
        assert_eq!(engine.metrics().stale_reads, 5);

        wait_until(|| engine.get_cache_status().is_valid, "a fresh table").await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_force_refresh_is_single_flight() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(
            MockRateProvider::new("live")
                .with_table(live_table())
                .with_delay(Duration::from_millis(20)),
        );
        let engine = engine_with(provider.clone(), clock);

        let (a, b) = tokio::join!(engine.force_refresh(), engine.force_refresh());

        assert_eq!(a, b);
        assert_eq!(a.source.as_deref(), Some("live"));
        assert_eq!(provider.calls(), 1);
        assert_eq!(engine.stats().metrics.refresh_joins, 1);
    }

    #[tokio::test]
    async fn test_convert_during_refresh_sees_whole_table() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(
            MockRateProvider::new("live")
                .with_table(live_table())
                .with_delay(Duration::from_millis(30)),
        );
        let engine = engine_with(provider, clock);
        engine.load_fallback_rates().unwrap();

        let snapshot_usd_ron = dec!(4.975) / dec!(1.085);
        let check = |result: ConversionResult| match result.source.as_str() {
            "SNAPSHOT" => assert_eq!(result.rate, snapshot_usd_ron),
            "live" => assert_eq!(result.rate, dec!(4)),
            other => panic!("unexpected source {other}"),
        };

        let early = engine.clone();
        let late = engine.clone();
        let (outcome, first, second) = tokio::join!(
            engine.force_refresh(),
            async move { early.convert(dec!(100), "USD", "RON") },
            async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                late.convert(dec!(100), "USD", "RON")
            },
        );

        assert!(outcome.success);
        check(first.unwrap());
        check(second.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_refresh() {
        let clock = Arc::new(ManualClock::starting_now());
        let provider = Arc::new(MockRateProvider::new("live").with_table(live_table()));
        let engine = engine_with(provider.clone(), clock);

        let handle = engine.spawn_refresh_task();
        tokio::time::sleep(engine.config().refresh_interval + Duration::from_secs(1)).await;
        handle.abort();

        assert_eq!(provider.calls(), 1);
        assert_eq!(engine.get_cache_status().source.as_deref(), Some("live"));
    }

    #[test]
    fn test_stats() {
        let engine = offline_engine();
        engine.convert(dec!(1), "EUR", "USD").unwrap();

        let stats = engine.stats();
        assert_eq!(stats.metrics.conversions, 1);
        assert_eq!(stats.providers, vec!["SNAPSHOT".to_string()]);
        assert!(stats.cache.rates_count > 10);
    }

    proptest! {
        #[test]
        fn prop_reciprocal_conversion(a in 0usize..30, b in 0usize..30) {
            let engine = offline_engine();
            let codes = engine.registry().codes();
            let (a, b) = (codes[a % codes.len()], codes[b % codes.len()]);

            let ab = engine.get_exchange_rate(a.as_str(), b.as_str()).unwrap().rate;
            let ba = engine.get_exchange_rate(b.as_str(), a.as_str()).unwrap().rate;
            prop_assert!((ab * ba - Decimal::ONE).abs() < dec!(0.0001));
        }

        #[test]
        fn prop_conversion_rounded_to_target(cents in -1_000_000_000i64..1_000_000_000i64) {
            let engine = offline_engine();
            let amount = Decimal::new(cents, 2);
            let result = engine.convert(amount, "EUR", "HUF").unwrap();

            prop_assert_eq!(result.converted_amount, result.converted_amount.round_dp(0));
            prop_assert!(cents >= 0 || result.converted_amount <= Decimal::ZERO);
            prop_assert!(cents <= 0 || result.converted_amount >= Decimal::ZERO);
        }
    }
}
