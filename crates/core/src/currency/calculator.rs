//! Amount calculator: price per unit, totals with fees, token units and
//! cross-currency conversion.
//!
//! All arithmetic runs on `Decimal`. Results carry exactly `precision`
//! fractional digits, so `to_string()` yields the formatted amount with
//! trailing zeros kept (`0.0200`, `0.00000000`).

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokensale_shared::config::ConfigError;
use tokensale_shared::types::CurrencyClass;
use tokensale_shared::PricingConfig;
use tracing::debug;

use super::error::CurrencyError;
use super::exchange::RateSource;
use super::precision::{round_to_precision, CurrencyRegistry};
use super::units::to_units;

/// Basis points per unit.
const BASIS_POINTS_PER_UNIT: i64 = 10_000;

/// Input for [`AmountCalculator::price_per_unit`].
#[derive(Debug, Clone, Copy)]
pub struct PricePerUnitInput {
    /// Rate from the base price currency to the target currency.
    pub exchange_rate: Decimal,
    /// Fractional digits of the result.
    pub precision: u32,
    /// Base price per token in the sale currency.
    pub base: Decimal,
}

/// Input for [`AmountCalculator::total_amount`].
#[derive(Debug, Clone, Default)]
pub struct TotalAmountInput {
    /// Price of one token, already rounded to the target precision.
    pub price_per_unit: Decimal,
    /// Number of tokens.
    pub quantity: Decimal,
    /// Whether to add the payment fee.
    pub add_fee: bool,
    /// Explicit precision; wins over `currency`.
    pub precision: Option<u32>,
    /// Currency whose class selects the precision when none is given.
    /// Without either, the FIAT precision applies.
    pub currency: Option<String>,
    /// Fee override in basis points; defaults to the configured rate.
    pub fee_basis_points: Option<Decimal>,
}

/// Grand total and the fee part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalAmount {
    /// Amount to pay, fees included.
    pub amount: Decimal,
    /// Fees charged.
    pub fees: Decimal,
}

/// Input for [`AmountCalculator::convert_currency`].
#[derive(Debug, Clone)]
pub struct ConvertInput {
    /// Amount in `from_currency`.
    pub amount: Decimal,
    /// Source currency symbol.
    pub from_currency: String,
    /// Target currency symbol.
    pub to_currency: String,
    /// Fractional digits of the result; defaults to the target's precision.
    pub precision: Option<u32>,
}

/// Result of a currency conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    /// Converted amount.
    pub amount: Decimal,
    /// Target currency symbol.
    pub currency: String,
    /// Price of one unit of the source currency in the target currency.
    pub price_per_unit: Decimal,
    /// Rate used, unrounded.
    pub exchange_rate: Decimal,
}

/// Input for [`AmountCalculator::quote`].
#[derive(Debug, Clone)]
pub struct QuoteInput {
    /// Token price in the sale currency.
    pub base_price: Decimal,
    /// Sale currency symbol.
    pub base_currency: String,
    /// Number of tokens.
    pub quantity: Decimal,
    /// Currency the buyer pays in.
    pub paid_currency: String,
    /// Whether the payment method carries a fee.
    pub add_fee: bool,
}

/// Priced purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Currency the buyer pays in.
    pub paid_currency: String,
    /// Precision of every amount in the quote.
    pub precision: u32,
    /// Rate from the sale currency to the paid currency.
    pub exchange_rate: Decimal,
    /// Token price in the paid currency.
    pub price_per_unit: Decimal,
    /// Amount to pay, fees included.
    pub amount: Decimal,
    /// Fees charged.
    pub fees: Decimal,
}

/// Pure amount computations plus one injected rate source.
///
/// The calculator holds no mutable state: identical inputs and an identical
/// rate table always give identical outputs.
#[derive(Clone)]
pub struct AmountCalculator {
    registry: CurrencyRegistry,
    fee_basis_points: Decimal,
    rates: Arc<dyn RateSource>,
}

impl std::fmt::Debug for AmountCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmountCalculator")
            .field("registry", &self.registry)
            .field("fee_basis_points", &self.fee_basis_points)
            .finish_non_exhaustive()
    }
}

impl AmountCalculator {
    /// Creates a calculator from a pricing configuration and a rate source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration does not validate.
    pub fn new(config: &PricingConfig, rates: Arc<dyn RateSource>) -> Result<Self, ConfigError> {
        Ok(Self {
            registry: CurrencyRegistry::from_config(config)?,
            fee_basis_points: config.fee_basis_points,
            rates,
        })
    }

    /// Returns the currency classification.
    #[must_use]
    pub const fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    /// Returns the configured fee in basis points.
    #[must_use]
    pub const fn fee_basis_points(&self) -> Decimal {
        self.fee_basis_points
    }

    /// Returns the FIAT or CRYPTO precision for a currency.
    pub fn precision(&self, currency: &str) -> Result<u32, CurrencyError> {
        self.registry.precision(currency)
    }

    /// Computes `round(exchange_rate * base, precision)`.
    ///
    /// A rate of exactly 1 still goes through rounding, since `base` may
    /// carry more digits than `precision` allows.
    pub fn price_per_unit(&self, input: PricePerUnitInput) -> Result<Decimal, CurrencyError> {
        ensure_non_negative(input.exchange_rate)?;
        ensure_non_negative(input.base)?;
        let raw = input
            .exchange_rate
            .checked_mul(input.base)
            .ok_or(CurrencyError::Overflow("price per unit"))?;
        self.round(raw, input.precision)
    }

    /// Computes the grand total and fees for a purchase.
    ///
    /// The fee is taken from the unrounded `price_per_unit * quantity`, then
    /// rounded on its own; the grand total is `round(raw + fees)`. This is not
    /// the same as `round(raw) + fees` in every case and must stay that way.
    pub fn total_amount(&self, input: &TotalAmountInput) -> Result<TotalAmount, CurrencyError> {
        ensure_non_negative(input.price_per_unit)?;
        ensure_non_negative(input.quantity)?;

        let precision = match (input.precision, input.currency.as_deref()) {
            (Some(precision), _) => precision,
            (None, Some(currency)) => self.registry.precision(currency)?,
            (None, None) => self.registry.precision_for_class(CurrencyClass::Fiat),
        };

        let raw_total = input
            .price_per_unit
            .checked_mul(input.quantity)
            .ok_or(CurrencyError::Overflow("total amount"))?;

        if !input.add_fee {
            return Ok(TotalAmount {
                amount: self.round(raw_total, precision)?,
                fees: self.round(Decimal::ZERO, precision)?,
            });
        }

        let basis_points = input.fee_basis_points.unwrap_or(self.fee_basis_points);
        if basis_points.is_sign_negative() || basis_points > Decimal::from(BASIS_POINTS_PER_UNIT) {
            return Err(CurrencyError::InvalidFeeRate(basis_points));
        }
        let fee_rate = basis_points / Decimal::from(BASIS_POINTS_PER_UNIT);

        let fees = self.round(
            raw_total
                .checked_mul(fee_rate)
                .ok_or(CurrencyError::Overflow("fees"))?,
            precision,
        )?;
        let amount = self.round(
            raw_total
                .checked_add(fees)
                .ok_or(CurrencyError::Overflow("total amount"))?,
            precision,
        )?;

        Ok(TotalAmount { amount, fees })
    }

    /// Converts a token amount into its smallest-unit integer.
    pub fn total_amount_crypto(&self, amount: Decimal, decimals: u32) -> Result<u128, CurrencyError> {
        to_units(amount, decimals)
    }

    /// Converts an amount between two currencies using the current rate table.
    ///
    /// Same-currency conversions use a rate of exactly 1 and skip the fetch.
    pub async fn convert_currency(&self, input: ConvertInput) -> Result<Conversion, CurrencyError> {
        ensure_non_negative(input.amount)?;
        self.registry.class_of(&input.from_currency)?;
        let precision = match input.precision {
            Some(precision) => precision,
            None => self.registry.precision(&input.to_currency)?,
        };

        let exchange_rate = self
            .exchange_rate(&input.from_currency, &input.to_currency)
            .await?;
        let converted = input
            .amount
            .checked_mul(exchange_rate)
            .ok_or(CurrencyError::Overflow("converted amount"))?;

        Ok(Conversion {
            amount: self.round(converted, precision)?,
            currency: input.to_currency.trim().to_ascii_uppercase(),
            price_per_unit: self.round(exchange_rate, precision)?,
            exchange_rate,
        })
    }

    /// Prices a purchase of `quantity` tokens paid in `paid_currency`.
    pub async fn quote(&self, input: QuoteInput) -> Result<Quote, CurrencyError> {
        let exchange_rate = self
            .exchange_rate(&input.base_currency, &input.paid_currency)
            .await?;
        self.quote_with_rate(&input, exchange_rate)
    }

    /// Prices a purchase with a rate fetched earlier. Performs no I/O.
    pub fn quote_with_rate(
        &self,
        input: &QuoteInput,
        exchange_rate: Decimal,
    ) -> Result<Quote, CurrencyError> {
        let precision = self.registry.precision(&input.paid_currency)?;
        let price_per_unit = self.price_per_unit(PricePerUnitInput {
            exchange_rate,
            precision,
            base: input.base_price,
        })?;
        let total = self.total_amount(&TotalAmountInput {
            price_per_unit,
            quantity: input.quantity,
            add_fee: input.add_fee,
            precision: Some(precision),
            ..TotalAmountInput::default()
        })?;

        Ok(Quote {
            paid_currency: input.paid_currency.trim().to_ascii_uppercase(),
            precision,
            exchange_rate,
            price_per_unit,
            amount: total.amount,
            fees: total.fees,
        })
    }

    /// Looks up the `from` to `to` rate, fetching the table once.
    ///
    /// Equal symbols give exactly 1 without a fetch.
    pub async fn exchange_rate(&self, from: &str, to: &str) -> Result<Decimal, CurrencyError> {
        self.registry.class_of(to)?;
        if from.trim().eq_ignore_ascii_case(to.trim()) {
            return Ok(Decimal::ONE);
        }

        debug!(from, to, "Fetching exchange rates");
        let table = self.rates.fetch_rates().await?;
        table.rate(from, to).ok_or_else(|| CurrencyError::RateNotFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn round(&self, value: Decimal, precision: u32) -> Result<Decimal, CurrencyError> {
        round_to_precision(value, precision, self.registry.rounding())
    }
}

fn ensure_non_negative(value: Decimal) -> Result<(), CurrencyError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CurrencyError::NegativeAmount(value));
    }
    Ok(())
}
