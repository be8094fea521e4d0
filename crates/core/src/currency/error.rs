//! Currency and amount calculation errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failure reported by an exchange rate source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Exchange rate source unavailable: {0}")]
pub struct RateSourceError(pub String);

/// Errors that can occur while computing amounts.
#[derive(Debug, Error)]
pub enum CurrencyError {
    /// Symbol is in neither the FIAT nor the CRYPTO set.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Rate table has no entry for the pair.
    #[error("No exchange rate found for {from} to {to}")]
    RateNotFound {
        /// Source currency symbol.
        from: String,
        /// Target currency symbol.
        to: String,
    },

    /// The injected rate source failed.
    #[error(transparent)]
    RateSource(#[from] RateSourceError),

    /// Negative amount where only non-negative values make sense.
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Decimal),

    /// Precision larger than a decimal can carry.
    #[error("Precision {0} exceeds the maximum of 28 decimal places")]
    InvalidPrecision(u32),

    /// Fee override outside `0..=10000` basis points.
    #[error("Fee basis points must be between 0 and 10000, got {0}")]
    InvalidFeeRate(Decimal),

    /// Arithmetic result does not fit the target representation.
    #[error("Amount overflow while computing {0}")]
    Overflow(&'static str),
}

impl CurrencyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UnknownCurrency(_)
            | Self::NegativeAmount(_)
            | Self::InvalidPrecision(_)
            | Self::InvalidFeeRate(_) => 400,
            Self::RateNotFound { .. } => 404,
            Self::Overflow(_) => 422,
            Self::RateSource(_) => 502,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            Self::RateNotFound { .. } => "RATE_NOT_FOUND",
            Self::RateSource(_) => "RATE_SOURCE_UNAVAILABLE",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::InvalidPrecision(_) => "INVALID_PRECISION",
            Self::InvalidFeeRate(_) => "INVALID_FEE_RATE",
            Self::Overflow(_) => "AMOUNT_OVERFLOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_currency_error() {
        let err = CurrencyError::UnknownCurrency("DOGE".to_string());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "UNKNOWN_CURRENCY");
        assert_eq!(err.to_string(), "Unknown currency: DOGE");
    }

    #[test]
    fn test_rate_not_found_error() {
        let err = CurrencyError::RateNotFound {
            from: "USD".to_string(),
            to: "ETH".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "RATE_NOT_FOUND");
    }

    #[test]
    fn test_rate_source_error_is_bad_gateway() {
        let err = CurrencyError::from(RateSourceError("timeout".to_string()));
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.error_code(), "RATE_SOURCE_UNAVAILABLE");
        assert_eq!(err.to_string(), "Exchange rate source unavailable: timeout");
    }
}
