//! Static registry of supported currencies.

use std::collections::HashMap;

use crate::currency::{normalize, CurrencyCode, CurrencyInfo, Region};

/// Euro-area member states, mapped to EUR by country lookups.
const EURO_AREA: &[&str] = &[
    "AT", "BE", "HR", "CY", "EE", "FI", "FR", "DE", "GR", "IE", "IT", "LV", "LT", "LU", "MT",
    "NL", "PT", "SK", "SI", "ES",
];

macro_rules! currency {
    ($code:literal, $name:literal, $symbol:literal, $decimals:literal, $country:literal, $cc:literal, $region:ident, $eu:literal, $major:literal) => {
        CurrencyInfo {
            code: CurrencyCode::from_ascii(*$code),
            name: $name,
            symbol: $symbol,
            decimals: $decimals,
            country: $country,
            country_code: $cc,
            region: Region::$region,
            is_eu_member: $eu,
            is_major: $major,
        }
    };
}

/// Every currency the engine knows about.
pub const SUPPORTED_CURRENCIES: &[CurrencyInfo] = &[
    currency!(b"EUR", "Euro", "€", 2, "European Union", "EU", Eu, true, true),
    currency!(b"USD", "US Dollar", "$", 2, "United States", "US", Americas, false, true),
    currency!(b"GBP", "British Pound", "£", 2, "United Kingdom", "GB", Eu, false, true),
    currency!(b"RON", "Romanian Leu", "lei", 2, "Romania", "RO", Eu, true, false),
    currency!(b"PLN", "Polish Zloty", "zł", 2, "Poland", "PL", Eu, true, false),
    currency!(b"CZK", "Czech Koruna", "Kč", 2, "Czech Republic", "CZ", Eu, true, false),
    currency!(b"HUF", "Hungarian Forint", "Ft", 0, "Hungary", "HU", Eu, true, false),
    currency!(b"BGN", "Bulgarian Lev", "лв", 2, "Bulgaria", "BG", Eu, true, false),
    currency!(b"CHF", "Swiss Franc", "CHF", 2, "Switzerland", "CH", Eu, false, true),
    currency!(b"SEK", "Swedish Krona", "kr", 2, "Sweden", "SE", Eu, true, false),
    currency!(b"NOK", "Norwegian Krone", "kr", 2, "Norway", "NO", Eu, false, false),
    currency!(b"DKK", "Danish Krone", "kr", 2, "Denmark", "DK", Eu, true, false),
    currency!(b"JPY", "Japanese Yen", "¥", 0, "Japan", "JP", Asia, false, true),
    currency!(b"CNY", "Chinese Yuan", "¥", 2, "China", "CN", Asia, false, true),
    currency!(b"AUD", "Australian Dollar", "A$", 2, "Australia", "AU", Oceania, false, true),
    currency!(b"CAD", "Canadian Dollar", "C$", 2, "Canada", "CA", Americas, false, true),
    currency!(b"TRY", "Turkish Lira", "₺", 2, "Turkey", "TR", Emea, false, false),
    currency!(b"RUB", "Russian Ruble", "₽", 2, "Russia", "RU", Emea, false, false),
    currency!(b"INR", "Indian Rupee", "₹", 2, "India", "IN", Asia, false, false),
    currency!(b"BRL", "Brazilian Real", "R$", 2, "Brazil", "BR", Americas, false, false),
    currency!(b"MXN", "Mexican Peso", "$", 2, "Mexico", "MX", Americas, false, false),
    currency!(b"ZAR", "South African Rand", "R", 2, "South Africa", "ZA", Emea, false, false),
    currency!(b"SGD", "Singapore Dollar", "S$", 2, "Singapore", "SG", Asia, false, false),
    currency!(b"HKD", "Hong Kong Dollar", "HK$", 2, "Hong Kong", "HK", Asia, false, false),
    currency!(b"KRW", "South Korean Won", "₩", 0, "South Korea", "KR", Asia, false, false),
    currency!(b"NZD", "New Zealand Dollar", "NZ$", 2, "New Zealand", "NZ", Oceania, false, false),
    currency!(b"AED", "UAE Dirham", "د.إ", 2, "United Arab Emirates", "AE", Emea, false, false),
    currency!(b"SAR", "Saudi Riyal", "﷼", 2, "Saudi Arabia", "SA", Emea, false, false),
    currency!(b"ILS", "Israeli Shekel", "₪", 2, "Israel", "IL", Emea, false, false),
    currency!(b"THB", "Thai Baht", "฿", 2, "Thailand", "TH", Asia, false, false),
];

/// Immutable lookup table of supported currencies.
///
/// Built once and shared behind an `Arc`; all lookups accept loosely formatted
/// input and canonicalize it before touching the maps.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    currencies: HashMap<CurrencyCode, CurrencyInfo>,
    by_country: HashMap<String, CurrencyCode>,
}

impl CurrencyRegistry {
    /// Registry with every entry of [`SUPPORTED_CURRENCIES`].
    pub fn standard() -> Self {
        Self::from_entries(SUPPORTED_CURRENCIES.iter().cloned())
    }

    /// Build a registry from explicit entries. Later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = CurrencyInfo>) -> Self {
        let mut currencies = HashMap::new();
        let mut by_country = HashMap::new();

        for info in entries {
            by_country.insert(normalize(info.country_code), info.code);
            by_country.insert(normalize(info.country), info.code);
            currencies.insert(info.code, info);
        }

        if currencies.contains_key(&CurrencyCode::EUR) {
            for member in EURO_AREA {
                by_country
                    .entry(member.to_string())
                    .or_insert(CurrencyCode::EUR);
            }
        }

        Self {
            currencies,
            by_country,
        }
    }

    /// All registered currencies, sorted by code.
    pub fn supported_currencies(&self) -> Vec<&CurrencyInfo> {
        let mut all: Vec<&CurrencyInfo> = self.currencies.values().collect();
        all.sort_by_key(|c| c.code);
        all
    }

    /// All registered codes, sorted.
    pub fn codes(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<CurrencyCode> = self.currencies.keys().copied().collect();
        codes.sort();
        codes
    }

    /// Case-insensitive lookup. Unknown or malformed codes give `None`.
    pub fn get(&self, code: &str) -> Option<&CurrencyInfo> {
        let code = CurrencyCode::parse(code).ok()?;
        self.currencies.get(&code)
    }

    /// Lookup by an already validated code.
    pub fn get_by_code(&self, code: CurrencyCode) -> Option<&CurrencyInfo> {
        self.currencies.get(&code)
    }

    /// Lookup by ISO 3166 alpha-2 code or country name, case-insensitive.
    pub fn get_by_country(&self, country: &str) -> Option<&CurrencyInfo> {
        let code = self.by_country.get(&normalize(country))?;
        self.currencies.get(code)
    }

    /// Case-insensitive membership test.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Whether a validated code is registered.
    pub fn contains(&self, code: CurrencyCode) -> bool {
        self.currencies.contains_key(&code)
    }

    /// Major currencies, sorted by code.
    pub fn major_currencies(&self) -> Vec<&CurrencyInfo> {
        self.filtered(|c| c.is_major)
    }

    /// Currencies issued by EU member states, sorted by code.
    pub fn eu_currencies(&self) -> Vec<&CurrencyInfo> {
        self.filtered(|c| c.is_eu_member)
    }

    /// Currencies of one dashboard region, sorted by code.
    pub fn by_region(&self, region: Region) -> Vec<&CurrencyInfo> {
        self.filtered(|c| c.region == region)
    }

    /// Number of registered currencies.
    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    fn filtered(&self, predicate: impl Fn(&CurrencyInfo) -> bool) -> Vec<&CurrencyInfo> {
        self.supported_currencies()
            .into_iter()
            .filter(|c| predicate(c))
            .collect()
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: &[&str] = &[
        "EUR", "RON", "USD", "GBP", "CHF", "JPY", "PLN", "CZK", "HUF", "BGN", "SEK", "DKK", "NOK",
    ];

    #[test]
    fn test_required_currencies_present() {
        let registry = CurrencyRegistry::standard();
        for code in REQUIRED {
            assert!(registry.is_supported(code), "{} missing", code);
        }
        assert_eq!(registry.len(), 30);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CurrencyRegistry::standard();
        assert_eq!(registry.get("eur"), registry.get("EUR"));
        assert_eq!(registry.get(" Eur ").map(|c| c.code), Some(CurrencyCode::EUR));
        assert!(registry.get("XYZ").is_none());
        assert!(registry.get("not-a-code").is_none());
    }

    #[test]
    fn test_is_supported_agrees_with_listing() {
        let registry = CurrencyRegistry::standard();
        for info in registry.supported_currencies() {
            assert!(registry.is_supported(info.code.as_str()));
            assert!(registry.is_supported(&info.code.as_str().to_lowercase()));
        }
        assert!(!registry.is_supported("xyz"));
    }

    #[test]
    fn test_zero_decimal_currencies() {
        let registry = CurrencyRegistry::standard();
        assert_eq!(registry.get("JPY").unwrap().decimals, 0);
        assert_eq!(registry.get("HUF").unwrap().decimals, 0);
        assert_eq!(registry.get("KRW").unwrap().decimals, 0);
        assert_eq!(registry.get("RON").unwrap().decimals, 2);
    }

    #[test]
    fn test_country_lookup() {
        let registry = CurrencyRegistry::standard();
        assert_eq!(registry.get_by_country("ro").unwrap().code, CurrencyCode::RON);
        assert_eq!(registry.get_by_country("Romania").unwrap().code, CurrencyCode::RON);
        assert_eq!(registry.get_by_country("de").unwrap().code, CurrencyCode::EUR);
        assert_eq!(registry.get_by_country("EU").unwrap().code, CurrencyCode::EUR);
        assert_eq!(registry.get_by_country("jp").unwrap().code, CurrencyCode::JPY);
        assert!(registry.get_by_country("ZZ").is_none());
    }

    #[test]
    fn test_group_queries() {
        let registry = CurrencyRegistry::standard();
        let majors: Vec<_> = registry.major_currencies().iter().map(|c| c.code).collect();
        assert!(majors.contains(&CurrencyCode::USD));
        assert!(!majors.contains(&CurrencyCode::RON));

        let eu: Vec<_> = registry.eu_currencies().iter().map(|c| c.code).collect();
        assert!(eu.contains(&CurrencyCode::RON));
        assert!(!eu.contains(&CurrencyCode::CHF));

        assert!(registry
            .by_region(Region::Oceania)
            .iter()
            .all(|c| c.region == Region::Oceania));
    }

    #[test]
    fn test_custom_registry_has_no_euro_area_without_eur() {
        let ron = SUPPORTED_CURRENCIES
            .iter()
            .find(|c| c.code == CurrencyCode::RON)
            .cloned()
            .unwrap();
        let registry = CurrencyRegistry::from_entries([ron]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get_by_country("DE").is_none());
    }
}
