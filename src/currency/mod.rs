//! Static currency table, conversion into and out of the base currency, and
//! amount formatting.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SplitError};

/// Base currency every `rate` is expressed against.
pub const BASE_CURRENCY: &str = "INR";

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new(BASE_CURRENCY)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Currency {
    pub code: CurrencyCode,
    pub symbol: String,
    pub name: String,
    /// Multiplier converting one unit of this currency into the base currency.
    pub rate: f64,
}

impl Currency {
    pub fn new(code: &str, symbol: &str, name: &str, rate: f64) -> Self {
        Self {
            code: CurrencyCode::new(code),
            symbol: symbol.into(),
            name: name.into(),
            rate,
        }
    }
}

static DEFAULT_TABLE: Lazy<CurrencyTable> = Lazy::new(|| {
    CurrencyTable::from_entries(vec![
        Currency::new("INR", "₹", "Indian Rupee", 1.0),
        Currency::new("USD", "$", "US Dollar", 83.12),
        Currency::new("EUR", "€", "Euro", 90.25),
        Currency::new("GBP", "£", "British Pound", 105.35),
        Currency::new("JPY", "¥", "Japanese Yen", 0.56),
        Currency::new("AUD", "A$", "Australian Dollar", 54.82),
        Currency::new("CAD", "C$", "Canadian Dollar", 61.45),
        Currency::new("SGD", "S$", "Singapore Dollar", 61.9),
        Currency::new("AED", "AED", "UAE Dirham", 22.63),
    ])
});

/// Lookup table keyed by currency code. Rates are static for the lifetime of
/// the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyTable {
    currencies: BTreeMap<CurrencyCode, Currency>,
}

impl CurrencyTable {
    fn from_entries(entries: Vec<Currency>) -> Self {
        let currencies = entries
            .into_iter()
            .map(|currency| (currency.code.clone(), currency))
            .collect();
        Self { currencies }
    }

    /// Builds a custom table. Every rate must be positive and finite.
    pub fn with_currencies(entries: Vec<Currency>) -> Result<Self> {
        if let Some(bad) = entries
            .iter()
            .find(|currency| !(currency.rate.is_finite() && currency.rate > 0.0))
        {
            return Err(SplitError::Validation(format!(
                "currency {} has invalid rate {}",
                bad.code, bad.rate
            )));
        }
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, code: &str) -> Result<&Currency> {
        self.currencies
            .get(&CurrencyCode::new(code))
            .ok_or_else(|| SplitError::UnknownCurrency(code.trim().to_uppercase()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.currencies.contains_key(&CurrencyCode::new(code))
    }

    pub fn rate_of(&self, code: &str) -> Result<f64> {
        self.get(code).map(|currency| currency.rate)
    }

    /// Converts `amount` from one currency into another through the base rate.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        let from_rate = self.rate_of(from)?;
        let to_rate = self.rate_of(to)?;
        if CurrencyCode::new(from) == CurrencyCode::new(to) {
            return Ok(amount);
        }
        Ok(amount * from_rate / to_rate)
    }

    pub fn codes(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.currencies.keys()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Renders `amount` with the currency symbol, e.g. `₹1,200.00`.
    pub fn format_amount(&self, amount: f64, code: &str) -> Result<String> {
        let currency = self.get(code)?;
        let precision = minor_units_for(currency.code.as_str());
        let body = format_number(amount.abs(), precision);
        let sign = if amount < 0.0 { "-" } else { "" };
        Ok(format!("{}{}{}", sign, currency.symbol, body))
    }
}

impl Default for CurrencyTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

fn format_number(value: f64, precision: u8) -> String {
    let body = format!("{:.*}", precision as usize, value);
    match body.split_once('.') {
        Some((int_part, fraction)) => format!("{}.{}", group_digits(int_part, ','), fraction),
        None => group_digits(&body, ','),
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}
