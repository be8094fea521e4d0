//! Currency precision, exchange rates and amount calculation.
//!
//! # Modules
//!
//! - `precision` - Currency classes and the rounding policy
//! - `exchange` - Rate table and the rate source seam
//! - `units` - Token amounts to smallest-unit integers
//! - `calculator` - Prices, totals with fees, conversions
//! - `error` - Currency error types

pub mod calculator;
pub mod error;
pub mod exchange;
pub mod precision;
pub mod units;

#[cfg(test)]
mod calculator_props;

pub use calculator::{
    AmountCalculator, Conversion, ConvertInput, PricePerUnitInput, Quote, QuoteInput,
    TotalAmount, TotalAmountInput,
};
pub use error::{CurrencyError, RateSourceError};
pub use exchange::{ExchangeRateTable, RateSource, StaticRateSource};
pub use precision::{round_to_precision, CurrencyRegistry, MAX_PRECISION};
pub use units::{from_units, to_units};
