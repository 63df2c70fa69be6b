//! Static currency table: ISO alpha code, gateway numeric code, minor units.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CurrencyEntry {
    /// ISO 4217 numeric code, as sent in `vads_currency`.
    pub numeric: &'static str,
    /// ISO 4217 alpha code.
    pub alpha: &'static str,
    /// Number of decimal places of the minor unit.
    pub decimals: u32,
}

const fn entry(alpha: &'static str, numeric: &'static str, decimals: u32) -> CurrencyEntry {
    CurrencyEntry {
        numeric,
        alpha,
        decimals,
    }
}

/// Currencies accepted by the gateway.
pub const CURRENCIES: &[CurrencyEntry] = &[
    entry("ARS", "032", 2),
    entry("AUD", "036", 2),
    entry("KHR", "116", 0),
    entry("CAD", "124", 2),
    entry("CLP", "152", 0),
    entry("CNY", "156", 2),
    entry("COP", "170", 2),
    entry("HRK", "191", 2),
    entry("CZK", "203", 2),
    entry("DKK", "208", 2),
    entry("HKD", "344", 2),
    entry("HUF", "348", 2),
    entry("INR", "356", 2),
    entry("IDR", "360", 2),
    entry("JPY", "392", 0),
    entry("KRW", "410", 0),
    entry("MYR", "458", 2),
    entry("MXN", "484", 2),
    entry("MAD", "504", 2),
    entry("NZD", "554", 2),
    entry("NOK", "578", 2),
    entry("PEN", "604", 2),
    entry("PHP", "608", 2),
    entry("RUB", "643", 2),
    entry("SGD", "702", 2),
    entry("ZAR", "710", 2),
    entry("SEK", "752", 2),
    entry("CHF", "756", 2),
    entry("THB", "764", 2),
    entry("TND", "788", 3),
    entry("GBP", "826", 2),
    entry("USD", "840", 2),
    entry("TWD", "901", 2),
    entry("RSD", "941", 2),
    entry("RON", "946", 2),
    entry("TRY", "949", 2),
    entry("XOF", "952", 0),
    entry("XPF", "953", 0),
    entry("BGN", "975", 2),
    entry("EUR", "978", 2),
    entry("PLN", "985", 2),
    entry("BRL", "986", 2),
];

/// Look up a currency by ISO alpha code (case-insensitive).
pub fn find_currency(alpha: &str) -> Option<&'static CurrencyEntry> {
    CURRENCIES
        .iter()
        .find(|c| c.alpha.eq_ignore_ascii_case(alpha.trim()))
}

/// Look up a currency by its numeric gateway code.
pub fn find_currency_by_numeric(numeric: &str) -> Option<&'static CurrencyEntry> {
    CURRENCIES.iter().find(|c| c.numeric == numeric.trim())
}

// ---------------------------------------------------------------------------
// CurrencyDirectory: host currency code to gateway currency
// ---------------------------------------------------------------------------

/// Resolves a host currency code to the gateway's currency entry.
pub trait CurrencyDirectory: Send + Sync {
    fn lookup(&self, code: &str) -> Option<CurrencyEntry>;
}

/// The built-in table, optionally narrowed by an allow-list.
#[derive(Debug, Clone, Default)]
pub struct CurrencyTable {
    allowed: Vec<String>,
}

impl CurrencyTable {
    /// The whole table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the given ISO codes; an empty list means the whole table.
    pub fn restricted_to<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }
}

impl CurrencyDirectory for CurrencyTable {
    fn lookup(&self, code: &str) -> Option<CurrencyEntry> {
        let entry = find_currency(code)?;
        if self.allowed.is_empty() || self.allowed.iter().any(|a| a == entry.alpha) {
            Some(*entry)
        } else {
            None
        }
    }
}
