//! Conversion result types.

use chrono::NaiveDate;
use leufx_common::{CurrencyCode, Timestamp};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Rate between two currencies, derived from the current table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `to` per one unit of `from`.
    pub rate: Decimal,
    pub timestamp: Timestamp,
    /// Provider of the table the rate came from.
    pub source: String,
}

/// Represents a completed currency conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    /// Unique conversion ID.
    pub id: Uuid,
    pub original_amount: Decimal,
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    /// Rounded to the target currency's decimals.
    pub converted_amount: Decimal,
    pub rate: Decimal,
    pub timestamp: Timestamp,
    pub source: String,
}

impl ConversionResult {
    /// Create a new conversion record.
    pub fn new(original_amount: Decimal, rate: &ExchangeRate, converted_amount: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            original_amount,
            from_currency: rate.from,
            to_currency: rate.to,
            converted_amount,
            rate: rate.rate,
            timestamp: rate.timestamp,
            source: rate.source.clone(),
        }
    }
}

/// One item of a multi-currency total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalBreakdown {
    pub original_amount: Decimal,
    pub original_currency: CurrencyCode,
    pub converted_amount: Decimal,
    pub rate: Decimal,
}

/// Sum of amounts in mixed currencies, expressed in one currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiCurrencyTotal {
    pub currency: CurrencyCode,
    pub total: Decimal,
    pub breakdown: Vec<TotalBreakdown>,
}

/// RON rate applied to an invoice issued in a foreign currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRate {
    pub currency: CurrencyCode,
    /// RON per one unit of `currency`.
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: String,
    /// True only for rates published by BNR.
    pub is_official: bool,
}

/// Amount converted to RON together with the fixing used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RonConversion {
    pub ron_amount: Decimal,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: String,
    pub is_official: bool,
}

/// RON amount converted into a foreign currency at the RON fixing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FromRonConversion {
    pub currency: CurrencyCode,
    /// Rounded to `currency`'s decimals.
    pub amount: Decimal,
    /// RON per one unit of `currency`.
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: String,
    pub is_official: bool,
}
