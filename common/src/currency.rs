//! Currency codes and currency metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CurrencyError;

/// Canonical form of user-supplied currency input: trimmed and uppercased.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// ISO 4217 currency code.
///
/// Always three uppercase ASCII letters. Construct through [`CurrencyCode::parse`]
/// (or `FromStr`), which applies [`normalize`] first, so `" eur"` and `"EUR"`
/// yield the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");
    pub const RON: CurrencyCode = CurrencyCode(*b"RON");
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const GBP: CurrencyCode = CurrencyCode(*b"GBP");
    pub const CHF: CurrencyCode = CurrencyCode(*b"CHF");
    pub const JPY: CurrencyCode = CurrencyCode(*b"JPY");
    pub const HUF: CurrencyCode = CurrencyCode(*b"HUF");

    pub(crate) const fn from_ascii(code: [u8; 3]) -> Self {
        Self(code)
    }

    /// Parse a currency code, normalizing case and surrounding whitespace.
    pub fn parse(code: &str) -> Result<Self, CurrencyError> {
        let normalized = normalize(code);
        let bytes = normalized.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(CurrencyError::InvalidCode(normalized));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Geographic grouping used by dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "EU")]
    Eu,
    Americas,
    Asia,
    #[serde(rename = "EMEA")]
    Emea,
    Oceania,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Eu => "EU",
            Region::Americas => "Americas",
            Region::Asia => "Asia",
            Region::Emea => "EMEA",
            Region::Oceania => "Oceania",
        };
        f.write_str(name)
    }
}

/// Static metadata for a supported currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    /// ISO 4217 code.
    pub code: CurrencyCode,
    /// Display name.
    pub name: &'static str,
    /// Display symbol.
    pub symbol: &'static str,
    /// Minor-unit precision used for rounding.
    pub decimals: u32,
    /// Issuing country (or union) name.
    pub country: &'static str,
    /// ISO 3166-1 alpha-2 code of the issuer (`EU` for the euro).
    pub country_code: &'static str,
    /// Dashboard region.
    pub region: Region,
    /// Issued by an EU member state.
    pub is_eu_member: bool,
    /// Widely traded major currency.
    pub is_major: bool,
}
