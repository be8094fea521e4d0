//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with its currency symbol.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in whole currency units (e.g. dollars, ether).
    pub amount: Decimal,
    /// Currency symbol: ISO 4217 code for FIAT, ticker for CRYPTO.
    pub currency: String,
}

/// Currency class used to select the canonical precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyClass {
    /// Government-issued currency (USD, EUR, ...).
    Fiat,
    /// Crypto asset (ETH, USDC, ...).
    Crypto,
}

impl Money {
    /// Creates a new Money instance. The currency symbol is upper-cased.
    #[must_use]
    pub fn new(amount: Decimal, currency: impl AsRef<str>) -> Self {
        Self {
            amount,
            currency: currency.as_ref().to_uppercase(),
        }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: impl AsRef<str>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl CurrencyClass {
    /// Returns the string representation of the class.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fiat => "FIAT",
            Self::Crypto => "CRYPTO",
        }
    }
}

impl std::fmt::Display for CurrencyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIAT" => Ok(Self::Fiat),
            "CRYPTO" => Ok(Self::Crypto),
            _ => Err(format!("Unknown currency class: {s}")),
        }
    }
}
