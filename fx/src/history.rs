//! Synthetic day-indexed rate series for charts.
//!
//! The series is derived from the current rate, not from archived fixings:
//! the last point is today's rate and earlier points follow a deterministic
//! bounded wave around it.

use chrono::{Days, NaiveDate};
use leufx_common::CurrencyCode;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Largest relative deviation of a synthesized point from the current rate.
pub const MAX_DEVIATION: f64 = 0.015;

/// One point of a rate series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRate {
    pub date: NaiveDate,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
}

/// Build `days + 1` points ending at `today`, oldest first.
///
/// Days that would fall before the earliest representable date are skipped.
pub fn synthesize(
    current: Decimal,
    from: CurrencyCode,
    to: CurrencyCode,
    today: NaiveDate,
    days: u32,
) -> Vec<HistoricalRate> {
    let phase = pair_phase(from, to);
    let flat = from == to;

    (0..=days)
        .rev()
        .filter_map(|days_ago| {
            let date = today.checked_sub_days(Days::new(u64::from(days_ago)))?;
            Some(HistoricalRate {
                date,
                from,
                to,
                rate: if flat {
                    current
                } else {
                    rate_at(current, days_ago, phase)
                },
            })
        })
        .collect()
}

fn rate_at(current: Decimal, days_ago: u32, phase: f64) -> Decimal {
    if days_ago == 0 {
        return current;
    }
    let t = f64::from(days_ago);
    let drift = 0.01 * (t * 0.45).sin() * (phase + t * 0.1).cos() + 0.005 * (t * 1.3 + phase).sin();
    let drift = drift.clamp(-MAX_DEVIATION, MAX_DEVIATION);
    let factor = Decimal::from_f64(1.0 + drift).unwrap_or(Decimal::ONE);
    (current * factor).round_dp(10)
}

fn pair_phase(from: CurrencyCode, to: CurrencyCode) -> f64 {
    let sum: u32 = from
        .as_str()
        .bytes()
        .chain(to.as_str().bytes())
        .map(u32::from)
        .sum();
    f64::from(sum % 17) / 17.0 * std::f64::consts::TAU
}
