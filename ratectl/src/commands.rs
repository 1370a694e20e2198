//! Subcommand handlers.

use anyhow::Context;
use leufx_common::CurrencyInfo;
use leufx_fx::{FormatOptions, FxEngine};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::output::Output;

pub fn status(engine: &FxEngine, out: &Output) -> anyhow::Result<()> {
    let stats = engine.stats();

    out.emit(&stats, || {
        let cache = &stats.cache;
        println!("Providers:    {}", stats.providers.join(" -> "));
        println!("Source:       {}", cache.source.as_deref().unwrap_or("-"));
        println!("Rates:        {}", cache.rates_count);
        println!("Valid:        {}", cache.is_valid);
        match cache.last_update {
            Some(at) => println!("Last update:  {}", at.to_rfc3339()),
            None => println!("Last update:  never"),
        }
        println!("TTL:          {}ms", cache.ttl_ms);
        println!("Refreshes:    {} ok / {} failed", stats.metrics.refresh_success, stats.metrics.refresh_failures);
        println!("Fallbacks:    {}", stats.metrics.provider_fallbacks);
    })
}

pub async fn refresh(engine: &FxEngine, out: &Output) -> anyhow::Result<()> {
    let outcome = engine.force_refresh().await;

    out.emit(&outcome, || {
        if outcome.success {
            println!(
                "Refreshed {} rates from {}",
                outcome.rates_count,
                outcome.source.as_deref().unwrap_or("-")
            );
        } else {
            println!("Refresh failed; cache left unchanged");
        }
    })?;

    if !outcome.success {
        anyhow::bail!("all rate providers failed");
    }
    Ok(())
}

pub fn convert(
    engine: &FxEngine,
    out: &Output,
    amount: &str,
    from: &str,
    targets: &[String],
) -> anyhow::Result<()> {
    let from_info = engine
        .get_currency(from)
        .with_context(|| format!("Unsupported currency: {from}"))?;
    let amount = engine
        .parse_amount(amount, from_info.code.as_str(), out.locale())
        .context("could not read amount")?;

    let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
    let results = engine.convert_to_multiple(amount, from, &targets)?;

    let options = FormatOptions::for_locale(out.locale());
    let source = engine.format_currency(amount, from, &options)?;
    let mut lines = Vec::with_capacity(results.len());
    for result in &results {
        let converted = engine.format_currency(
            result.converted_amount,
            result.to_currency.as_str(),
            &options,
        )?;
        lines.push(format!("{source} = {converted}  (rate {}, {})", result.rate.round_dp(6), result.source));
    }

    out.emit(&results, || lines.iter().for_each(|line| println!("{line}")))
}

pub fn rates(engine: &FxEngine, out: &Output, base: &str) -> anyhow::Result<()> {
    let rates = engine.get_rates_for_base(base)?;

    out.emit(&rates, || {
        for (code, rate) in &rates {
            println!("{code}  {}", rate.round_dp(6));
        }
    })
}

pub fn history(
    engine: &FxEngine,
    out: &Output,
    from: &str,
    to: &str,
    days: Option<u32>,
) -> anyhow::Result<()> {
    let series = engine.get_historical_rates(from, to, days)?;

    out.emit(&series, || {
        println!("Synthetic series (derived from the current rate)");
        for point in &series {
            println!("{}  {}", point.date, point.rate.round_dp(6));
        }
    })
}

pub fn invoice(engine: &FxEngine, out: &Output, currency: &str) -> anyhow::Result<()> {
    let rate = engine.get_rate_for_invoice(currency)?;

    out.emit(&rate, || {
        println!("1 {} = {} RON", rate.currency, rate.rate.round_dp(4));
        println!("Date:     {}", rate.rate_date);
        println!("Source:   {}", rate.source);
        println!("Official: {}", if rate.is_official { "yes" } else { "no" });
    })
}

#[derive(Serialize)]
struct CurrencyRow<'a> {
    #[serde(flatten)]
    info: &'a CurrencyInfo,
    sample: String,
}

pub fn currencies(engine: &FxEngine, out: &Output, major_only: bool) -> anyhow::Result<()> {
    let options = FormatOptions::for_locale(out.locale());
    let sample = Decimal::new(123456789, 2);

    let rows = engine
        .supported_currencies()
        .into_iter()
        .filter(|info| !major_only || info.is_major)
        .map(|info| {
            anyhow::Ok(CurrencyRow {
                info,
                sample: engine.format_currency(sample, info.code.as_str(), &options)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    out.emit(&rows, || {
        for row in &rows {
            println!(
                "{}  {:<22} {:<6} {:<9} {}",
                row.info.code,
                row.info.name,
                row.info.symbol,
                row.info.region.to_string(),
                row.sample
            );
        }
    })
}
