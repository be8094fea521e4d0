//! Conversion between human-readable token amounts and smallest units.
//!
//! A token with `decimals = 18` stores `1.5` as `1_500_000_000_000_000_000`.
//! Digits below the smallest unit are truncated, never rounded up.

use rust_decimal::Decimal;

use super::error::CurrencyError;
use super::precision::MAX_PRECISION;

/// Scales `amount` by `10^decimals` and truncates to an integer.
///
/// # Errors
///
/// - `NegativeAmount` for amounts below zero
/// - `Overflow` when the scaled value does not fit in `u128`
pub fn to_units(amount: Decimal, decimals: u32) -> Result<u128, CurrencyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CurrencyError::NegativeAmount(amount));
    }

    let mantissa = amount.mantissa().unsigned_abs();
    let scale = amount.scale();

    if decimals >= scale {
        let factor = 10u128
            .checked_pow(decimals - scale)
            .ok_or(CurrencyError::Overflow("token units"))?;
        mantissa
            .checked_mul(factor)
            .ok_or(CurrencyError::Overflow("token units"))
    } else {
        // scale <= 28, so the divisor always fits
        Ok(mantissa / 10u128.pow(scale - decimals))
    }
}

/// Inverse of [`to_units`]: divides `units` by `10^decimals`.
///
/// # Errors
///
/// - `InvalidPrecision` when `decimals` exceeds 28
/// - `Overflow` when `units` exceeds what a decimal can hold
pub fn from_units(units: u128, decimals: u32) -> Result<Decimal, CurrencyError> {
    if decimals > MAX_PRECISION {
        return Err(CurrencyError::InvalidPrecision(decimals));
    }
    let value = i128::try_from(units).map_err(|_| CurrencyError::Overflow("token amount"))?;
    Decimal::try_from_i128_with_scale(value, decimals)
        .map(|d| d.normalize())
        .map_err(|_| CurrencyError::Overflow("token amount"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(1.5), 18, 1_500_000_000_000_000_000)]
    #[case(dec!(100), 6, 100_000_000)]
    #[case(dec!(0.000001), 6, 1)]
    #[case(dec!(0), 18, 0)]
    fn test_to_units(#[case] amount: Decimal, #[case] decimals: u32, #[case] expected: u128) {
        assert_eq!(to_units(amount, decimals).unwrap(), expected);
    }

    #[test]
    fn test_to_units_truncates_below_smallest_unit() {
        // 0.1234567 with 6 decimals keeps 123456 units
        assert_eq!(to_units(dec!(0.1234567), 6).unwrap(), 123_456);
        assert_eq!(to_units(dec!(0.9999999), 0).unwrap(), 0);
    }

    #[test]
    fn test_to_units_rejects_negative() {
        assert!(matches!(
            to_units(dec!(-1), 18),
            Err(CurrencyError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_to_units_overflow() {
        assert!(matches!(
            to_units(dec!(1000000000000000000000), 18),
            Err(CurrencyError::Overflow(_))
        ));
        assert!(matches!(to_units(dec!(1), 40), Err(CurrencyError::Overflow(_))));
    }

    #[test]
    fn test_from_units_inverse() {
        assert_eq!(from_units(1_500_000_000_000_000_000, 18).unwrap(), dec!(1.5));
        assert_eq!(from_units(1, 8).unwrap(), dec!(0.00000001));
        assert!(matches!(
            from_units(1, 29),
            Err(CurrencyError::InvalidPrecision(29))
        ));
    }

    #[test]
    fn test_round_trip_truncates_to_smallest_unit() {
        let amount = dec!(12.3456789);
        let back = from_units(to_units(amount, 4).unwrap(), 4).unwrap();
        assert_eq!(back, dec!(12.3456));
    }
}
