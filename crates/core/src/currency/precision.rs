//! Decimal precision policy.
//!
//! Every currency belongs to exactly one class, and the class decides how
//! many fractional digits an amount keeps. The classification is built once
//! from a validated [`PricingConfig`] and is closed afterwards: a symbol that
//! was not configured is an error, never a silent default.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tokensale_shared::config::{normalize_symbol, ConfigError};
use tokensale_shared::types::CurrencyClass;
use tokensale_shared::{PricingConfig, RoundingMode};

use super::error::CurrencyError;

/// Largest scale a `Decimal` can carry.
pub const MAX_PRECISION: u32 = 28;

/// Closed classification of the known currencies.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    classes: HashMap<String, CurrencyClass>,
    fiat_precision: u32,
    crypto_precision: u32,
    rounding: RoundingMode,
}

impl CurrencyRegistry {
    /// Builds the registry, validating the configuration first.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the currency sets, precisions or fee are inconsistent.
    pub fn from_config(config: &PricingConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut classes = HashMap::new();
        for symbol in &config.fiat_currencies {
            classes.insert(normalize_symbol(symbol)?, CurrencyClass::Fiat);
        }
        for symbol in &config.crypto_currencies {
            classes.insert(normalize_symbol(symbol)?, CurrencyClass::Crypto);
        }

        Ok(Self {
            classes,
            fiat_precision: config.fiat_precision,
            crypto_precision: config.crypto_precision,
            rounding: config.rounding,
        })
    }

    /// Returns the class of a currency symbol (case-insensitive).
    pub fn class_of(&self, symbol: &str) -> Result<CurrencyClass, CurrencyError> {
        self.classes
            .get(&symbol.trim().to_ascii_uppercase())
            .copied()
            .ok_or_else(|| CurrencyError::UnknownCurrency(symbol.to_string()))
    }

    /// Returns the canonical precision for a currency symbol.
    pub fn precision(&self, symbol: &str) -> Result<u32, CurrencyError> {
        self.class_of(symbol)
            .map(|class| self.precision_for_class(class))
    }

    /// Returns the precision configured for a class.
    #[must_use]
    pub const fn precision_for_class(&self, class: CurrencyClass) -> u32 {
        match class {
            CurrencyClass::Fiat => self.fiat_precision,
            CurrencyClass::Crypto => self.crypto_precision,
        }
    }

    /// Returns the rounding mode shared by every precision cut.
    #[must_use]
    pub const fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Returns true if the symbol is known.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.class_of(symbol).is_ok()
    }

    /// Returns all known symbols of a class, sorted.
    #[must_use]
    pub fn symbols(&self, class: CurrencyClass) -> Vec<&str> {
        let mut symbols: Vec<&str> = self
            .classes
            .iter()
            .filter(|(_, c)| **c == class)
            .map(|(s, _)| s.as_str())
            .collect();
        symbols.sort_unstable();
        symbols
    }
}

/// Rounds `value` to `precision` places and pins the scale to exactly
/// `precision`, so the string form always shows every fractional digit.
///
/// # Errors
///
/// Returns `CurrencyError::InvalidPrecision` when `precision` exceeds 28.
pub fn round_to_precision(
    value: Decimal,
    precision: u32,
    rounding: RoundingMode,
) -> Result<Decimal, CurrencyError> {
    if precision > MAX_PRECISION {
        return Err(CurrencyError::InvalidPrecision(precision));
    }
    let mut rounded = value.round_dp_with_strategy(precision, rounding.strategy());
    rounded.rescale(precision);
    // -0.00 prints with a sign
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    Ok(rounded)
}
