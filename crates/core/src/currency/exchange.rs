//! Exchange rate table and the rate source seam.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::RateSourceError;

/// Base currency → quote currency → rate (1 base = rate quote).
///
/// The table is taken as delivered: no symmetry or arbitrage-free
/// consistency is enforced, and no path is searched through intermediate
/// currencies. A currency quoted against itself is always 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, HashMap<String, Decimal>>")]
#[serde(into = "HashMap<String, HashMap<String, Decimal>>")]
pub struct ExchangeRateTable {
    rates: HashMap<String, HashMap<String, Decimal>>,
}

impl ExchangeRateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a rate, returning the table for chaining.
    #[must_use]
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.insert(from, to, rate);
        self
    }

    /// Adds or replaces a rate.
    pub fn insert(&mut self, from: &str, to: &str, rate: Decimal) {
        self.rates
            .entry(normalize(from))
            .or_default()
            .insert(normalize(to), rate);
    }

    /// Looks up the rate for a pair. Same-currency pairs are exactly 1.
    #[must_use]
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let from = normalize(from);
        let to = normalize(to);
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&from).and_then(|quotes| quotes.get(&to)).copied()
    }

    /// Returns true if the table holds no rates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.values().all(HashMap::is_empty)
    }
}

impl From<HashMap<String, HashMap<String, Decimal>>> for ExchangeRateTable {
    fn from(raw: HashMap<String, HashMap<String, Decimal>>) -> Self {
        let mut table = Self::new();
        for (from, quotes) in raw {
            for (to, rate) in quotes {
                table.insert(&from, &to, rate);
            }
        }
        table
    }
}

impl From<ExchangeRateTable> for HashMap<String, HashMap<String, Decimal>> {
    fn from(table: ExchangeRateTable) -> Self {
        table.rates
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Supplies the current rate table.
///
/// This is the calculator's only I/O seam. Implementations own any retry,
/// caching or timeout policy; the calculator calls `fetch_rates` at most once
/// per operation and never retries.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches the current rate table.
    async fn fetch_rates(&self) -> Result<ExchangeRateTable, RateSourceError>;
}

/// Rate source returning a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticRateSource {
    table: ExchangeRateTable,
}

impl StaticRateSource {
    /// Creates a source that always returns `table`.
    #[must_use]
    pub const fn new(table: ExchangeRateTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn fetch_rates(&self) -> Result<ExchangeRateTable, RateSourceError> {
        Ok(self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_same_currency_rate_is_one() {
        let table = ExchangeRateTable::new();
        assert_eq!(table.rate("USD", "usd"), Some(Decimal::ONE));
    }

    #[test]
    fn test_direct_lookup_only() {
        let table = ExchangeRateTable::new()
            .with_rate("USD", "EUR", dec!(0.92))
            .with_rate("EUR", "ETH", dec!(0.0003));
        assert_eq!(table.rate("usd", "eur"), Some(dec!(0.92)));
        // No inverse and no path through EUR
        assert_eq!(table.rate("EUR", "USD"), None);
        assert_eq!(table.rate("USD", "ETH"), None);
    }

    #[test]
    fn test_asymmetric_rates_kept_as_given() {
        let table = ExchangeRateTable::new()
            .with_rate("USD", "CHF", dec!(0.9))
            .with_rate("CHF", "USD", dec!(1.2));
        assert_eq!(table.rate("USD", "CHF"), Some(dec!(0.9)));
        assert_eq!(table.rate("CHF", "USD"), Some(dec!(1.2)));
    }

    #[test]
    fn test_deserialize_normalizes_symbols() {
        let table: ExchangeRateTable =
            serde_json::from_str(r#"{"usd": {"eth": "0.00031"}}"#).unwrap();
        assert_eq!(table.rate("USD", "ETH"), Some(dec!(0.00031)));
        assert!(!table.is_empty());
    }

    #[tokio::test]
    async fn test_static_source_returns_table() {
        let table = ExchangeRateTable::new().with_rate("USD", "ETH", dec!(0.0003));
        let source = StaticRateSource::new(table.clone());
        assert_eq!(source.fetch_rates().await.unwrap(), table);
    }
}
