//! Locale-aware currency formatting and parsing.

use std::sync::Arc;

use leufx_common::{round_half_up, CurrencyCode, CurrencyError, CurrencyInfo, CurrencyRegistry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";

/// Locale used when nothing better matches.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Where the currency symbol goes relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPosition {
    /// `$1,234.56`
    Prefix,
    /// `€ 1.234,56`
    PrefixSpaced,
    /// `1.234,56 €`
    Suffix,
}

/// Number conventions of one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleFormat {
    pub tag: &'static str,
    pub group_separator: &'static str,
    pub decimal_separator: char,
    pub symbol_position: SymbolPosition,
    /// Integer digits needed before grouping kicks in.
    pub min_grouping_digits: usize,
}

const fn locale(
    tag: &'static str,
    group_separator: &'static str,
    decimal_separator: char,
    symbol_position: SymbolPosition,
    min_grouping_digits: usize,
) -> LocaleFormat {
    LocaleFormat {
        tag,
        group_separator,
        decimal_separator,
        symbol_position,
        min_grouping_digits,
    }
}

use SymbolPosition::{Prefix, PrefixSpaced, Suffix};

/// Known locales. The first entry for a language is its fallback.
pub const LOCALES: &[LocaleFormat] = &[
    locale("en-US", ",", '.', Prefix, 4),
    locale("en-GB", ",", '.', Prefix, 4),
    locale("de-DE", ".", ',', Suffix, 4),
    locale("de-AT", NBSP, ',', PrefixSpaced, 4),
    locale("de-CH", "’", '.', PrefixSpaced, 4),
    locale("fr-FR", NARROW_NBSP, ',', Suffix, 4),
    locale("it-IT", ".", ',', Suffix, 4),
    locale("es-ES", ".", ',', Suffix, 5),
    locale("nl-NL", ".", ',', PrefixSpaced, 4),
    locale("ro-RO", ".", ',', Suffix, 4),
    locale("pl-PL", NBSP, ',', Suffix, 5),
    locale("hu-HU", NBSP, ',', Suffix, 4),
    locale("cs-CZ", NBSP, ',', Suffix, 4),
    locale("bg-BG", NBSP, ',', Suffix, 5),
    locale("sv-SE", NBSP, ',', Suffix, 4),
    locale("da-DK", ".", ',', Suffix, 4),
    locale("nb-NO", NBSP, ',', Suffix, 4),
    locale("ja-JP", ",", '.', Prefix, 4),
];

/// Resolve a BCP 47 tag: exact match, then language subtag, then `en-US`.
pub fn locale_format(tag: &str) -> &'static LocaleFormat {
    let tag = tag.trim().replace('_', "-");

    if let Some(found) = LOCALES.iter().find(|l| l.tag.eq_ignore_ascii_case(&tag)) {
        return found;
    }

    let language = tag.split('-').next().unwrap_or_default();
    LOCALES
        .iter()
        .find(|l| {
            l.tag
                .split('-')
                .next()
                .is_some_and(|lang| lang.eq_ignore_ascii_case(language))
        })
        .unwrap_or(&LOCALES[0])
}

/// Formatting switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub locale: String,
    pub show_symbol: bool,
    pub show_code: bool,
    /// Overrides the currency's own precision.
    pub decimals: Option<u32>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            show_symbol: true,
            show_code: false,
            decimals: None,
        }
    }
}

impl FormatOptions {
    pub fn for_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self) -> Self {
        self.show_code = true;
        self
    }

    pub fn without_symbol(mut self) -> Self {
        self.show_symbol = false;
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }
}

/// Format `amount` in `currency` per `options`.
pub fn format_amount(amount: Decimal, currency: &CurrencyInfo, options: &FormatOptions) -> String {
    let locale = locale_format(&options.locale);
    let decimals = options.decimals.unwrap_or(currency.decimals);
    let rounded = round_half_up(amount, decimals);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let number = format_number(rounded.abs(), decimals, locale);

    let mut out = String::with_capacity(number.len() + 8);
    if negative {
        out.push('-');
    }

    if options.show_symbol {
        match locale.symbol_position {
            Prefix => {
                out.push_str(currency.symbol);
                out.push_str(&number);
            }
            PrefixSpaced => {
                out.push_str(currency.symbol);
                out.push_str(NBSP);
                out.push_str(&number);
            }
            Suffix => {
                out.push_str(&number);
                out.push_str(NBSP);
                out.push_str(currency.symbol);
            }
        }
    } else {
        out.push_str(&number);
    }

    if options.show_code {
        out.push_str(NBSP);
        out.push_str(currency.code.as_str());
    }

    out
}

fn format_number(abs: Decimal, decimals: u32, locale: &LocaleFormat) -> String {
    let text = format!("{:.*}", decimals as usize, abs);
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = group_digits(integer, locale.group_separator, locale.min_grouping_digits);
    if let Some(fraction) = fraction.filter(|f| !f.is_empty()) {
        out.push(locale.decimal_separator);
        out.push_str(fraction);
    }
    out
}

fn group_digits(digits: &str, separator: &str, min_grouping_digits: usize) -> String {
    let len = digits.len();
    if len < min_grouping_digits {
        return digits.to_string();
    }

    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Parse text produced by [`format_amount`] (or typed by a user) back to a
/// decimal rounded to the currency's precision.
pub fn parse_amount(text: &str, currency: &CurrencyInfo, locale: &str) -> FxResult<Decimal> {
    let locale = locale_format(locale);
    let stripped = text
        .replace(currency.code.as_str(), "")
        .replace(currency.symbol, "");

    let mut normalized = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        if ch.is_ascii_digit() {
            normalized.push(ch);
        } else if ch == '-' && normalized.is_empty() {
            normalized.push(ch);
        } else if ch == locale.decimal_separator {
            normalized.push('.');
        }
    }

    let value: Decimal = normalized
        .parse()
        .map_err(|_| CurrencyError::InvalidAmount(text.to_string()))?;
    Ok(round_half_up(value, currency.decimals))
}

/// Registry-backed formatter used by the engine.
#[derive(Debug, Clone)]
pub struct CurrencyFormatter {
    registry: Arc<CurrencyRegistry>,
}

impl CurrencyFormatter {
    pub fn new(registry: Arc<CurrencyRegistry>) -> Self {
        Self { registry }
    }

    fn info(&self, code: &str) -> FxResult<&CurrencyInfo> {
        self.registry
            .get(code)
            .ok_or_else(|| FxError::UnsupportedCurrency(leufx_common::normalize(code)))
    }

    pub fn format_currency(
        &self,
        amount: Decimal,
        currency: &str,
        options: &FormatOptions,
    ) -> FxResult<String> {
        Ok(format_amount(amount, self.info(currency)?, options))
    }

    /// RON in Romanian conventions: `1.234,56 lei`.
    pub fn format_ron(&self, amount: Decimal) -> FxResult<String> {
        self.format_currency(amount, CurrencyCode::RON.as_str(), &FormatOptions::for_locale("ro-RO"))
    }

    /// EUR in German conventions: `1.234,56 €`.
    pub fn format_eur(&self, amount: Decimal) -> FxResult<String> {
        self.format_currency(amount, CurrencyCode::EUR.as_str(), &FormatOptions::for_locale("de-DE"))
    }

    pub fn parse_amount(&self, text: &str, currency: &str, locale: &str) -> FxResult<Decimal> {
        parse_amount(text, self.info(currency)?, locale)
    }
}
