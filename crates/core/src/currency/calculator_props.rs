//! Property-based tests for the amount calculator.
//!
//! - Totals and fees carry exactly the requested precision
//! - Totals and fees match an independently computed half-up rounding
//! - A fee-bearing total is strictly larger than the same total without fee
//! - Fees never exceed the raw total
//! - Repeated calls give byte-identical strings
//! - Price per unit is stable under re-rounding
//! - Token units never gain value on the way back

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use tokensale_shared::PricingConfig;

use super::calculator::{AmountCalculator, PricePerUnitInput, TotalAmountInput};
use super::exchange::StaticRateSource;
use super::units::{from_units, to_units};

/// Strategy to generate token prices (0.000001 to 1,000.000000).
fn token_price() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|v| Decimal::new(v, 6))
}

/// Strategy to generate token quantities (1 to 1,000,000).
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(Decimal::from)
}

/// Strategy to generate exchange rates (0.00000001 to 100.00000000).
fn exchange_rate() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000_000i64).prop_map(|v| Decimal::new(v, 8))
}

fn precision() -> impl Strategy<Value = u32> {
    0u32..=8
}

fn fee_basis_points() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(Decimal::from)
}

/// Strategy for fee rates that always charge something (1 to 10,000 bps).
fn charging_basis_points() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000i64).prop_map(Decimal::from)
}

/// Strategy for raw totals large enough that any fee is at least one cent
/// at every precision: price >= 1 and quantity >= 10,000.
fn large_price() -> impl Strategy<Value = Decimal> {
    (1_000_000i64..1_000_000_000i64).prop_map(|v| Decimal::new(v, 6))
}

fn large_quantity() -> impl Strategy<Value = Decimal> {
    (10_000i64..1_000_000i64).prop_map(Decimal::from)
}

/// Half-up rounding written out directly, independent of the calculator.
fn half_up(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

fn calculator(fee_basis_points: Decimal) -> AmountCalculator {
    let config = PricingConfig {
        fee_basis_points,
        ..PricingConfig::default()
    };
    AmountCalculator::new(&config, Arc::new(StaticRateSource::default()))
        .expect("valid pricing config")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Every amount in a total has exactly `precision` fractional digits.
    #[test]
    fn prop_total_has_exact_scale(
        price in token_price(),
        qty in quantity(),
        precision in precision(),
        bps in fee_basis_points(),
        add_fee in any::<bool>(),
    ) {
        let total = calculator(bps)
            .total_amount(&TotalAmountInput {
                price_per_unit: price,
                quantity: qty,
                add_fee,
                precision: Some(precision),
                ..TotalAmountInput::default()
            })
            .unwrap();
        prop_assert_eq!(total.amount.scale(), precision);
        prop_assert_eq!(total.fees.scale(), precision);
    }

    /// Without a fee the fees are zero and the total is the rounded product.
    #[test]
    fn prop_no_fee_means_zero_fees(
        price in token_price(),
        qty in quantity(),
        precision in precision(),
        bps in fee_basis_points(),
    ) {
        let total = calculator(bps)
            .total_amount(&TotalAmountInput {
                price_per_unit: price,
                quantity: qty,
                add_fee: false,
                precision: Some(precision),
                ..TotalAmountInput::default()
            })
            .unwrap();
        prop_assert_eq!(total.fees.to_string(), Decimal::new(0, precision).to_string());
        prop_assert_eq!(total.amount, half_up(price * qty, precision));
    }

    /// Fees come from the unrounded raw total; the grand total is the
    /// rounded sum of raw total and rounded fees.
    #[test]
    fn prop_fee_matches_formula(
        price in token_price(),
        qty in quantity(),
        precision in precision(),
        bps in fee_basis_points(),
    ) {
        let total = calculator(bps)
            .total_amount(&TotalAmountInput {
                price_per_unit: price,
                quantity: qty,
                add_fee: true,
                precision: Some(precision),
                ..TotalAmountInput::default()
            })
            .unwrap();

        let raw = price * qty;
        let expected_fees = half_up(raw * bps / Decimal::from(10_000), precision);
        prop_assert_eq!(total.fees, expected_fees);
        prop_assert_eq!(total.amount, half_up(raw + expected_fees, precision));
    }

    /// Charging a fee always makes the total strictly larger.
    #[test]
    fn prop_fee_strictly_increases_total(
        price in large_price(),
        qty in large_quantity(),
        precision in precision(),
        bps in charging_basis_points(),
    ) {
        let calc = calculator(bps);
        let input = TotalAmountInput {
            price_per_unit: price,
            quantity: qty,
            add_fee: true,
            precision: Some(precision),
            ..TotalAmountInput::default()
        };
        let with_fee = calc.total_amount(&input).unwrap();
        let without_fee = calc
            .total_amount(&TotalAmountInput { add_fee: false, ..input })
            .unwrap();

        prop_assert!(without_fee.amount < with_fee.amount);
    }

    /// Two calls with the same input print the same strings.
    #[test]
    fn prop_total_amount_idempotent(
        price in token_price(),
        qty in quantity(),
        precision in precision(),
        bps in fee_basis_points(),
        add_fee in any::<bool>(),
    ) {
        let calc = calculator(bps);
        let input = TotalAmountInput {
            price_per_unit: price,
            quantity: qty,
            add_fee,
            precision: Some(precision),
            ..TotalAmountInput::default()
        };
        let first = calc.total_amount(&input).unwrap();
        let second = calc.total_amount(&input).unwrap();

        prop_assert_eq!(first.amount.to_string(), second.amount.to_string());
        prop_assert_eq!(first.fees.to_string(), second.fees.to_string());
    }

    /// Fees are bounded by the rounded raw total and the total never shrinks.
    #[test]
    fn prop_fee_bounded_and_monotonic(
        price in token_price(),
        qty in quantity(),
        precision in precision(),
        bps in fee_basis_points(),
    ) {
        let calc = calculator(bps);
        let input = TotalAmountInput {
            price_per_unit: price,
            quantity: qty,
            add_fee: true,
            precision: Some(precision),
            ..TotalAmountInput::default()
        };
        let with_fee = calc.total_amount(&input).unwrap();
        let without_fee = calc
            .total_amount(&TotalAmountInput { add_fee: false, ..input })
            .unwrap();

        prop_assert!(with_fee.fees >= Decimal::ZERO);
        prop_assert!(with_fee.fees <= without_fee.amount + Decimal::new(1, precision));
        prop_assert!(with_fee.amount >= without_fee.amount);
    }

    /// Rounding an already rounded price per unit changes nothing.
    #[test]
    fn prop_price_per_unit_idempotent(
        base in token_price(),
        rate in exchange_rate(),
        precision in precision(),
    ) {
        let calc = calculator(Decimal::ZERO);
        let once = calc
            .price_per_unit(PricePerUnitInput { exchange_rate: rate, precision, base })
            .unwrap();
        let twice = calc
            .price_per_unit(PricePerUnitInput { exchange_rate: Decimal::ONE, precision, base: once })
            .unwrap();
        prop_assert_eq!(once, twice);
        prop_assert_eq!(once.to_string(), twice.to_string());
    }

    /// Converting to units and back loses at most one smallest unit.
    #[test]
    fn prop_units_round_trip_truncates(
        amount in token_price(),
        decimals in 0u32..=18,
    ) {
        let units = to_units(amount, decimals).unwrap();
        let back = from_units(units, decimals).unwrap();
        prop_assert!(back <= amount);
        prop_assert!(amount - back < Decimal::new(1, decimals));
    }
}
