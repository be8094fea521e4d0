//! Application configuration management.

use std::collections::HashSet;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use thiserror::Error;

use crate::types::CurrencyClass;

/// Largest scale a `Decimal` can carry.
const MAX_PRECISION: u32 = 28;

/// Fee rates are expressed in parts per ten thousand.
const MAX_FEE_BASIS_POINTS: i64 = 10_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A currency class has no symbols configured.
    #[error("No {0} currencies configured")]
    EmptyCurrencySet(CurrencyClass),

    /// A symbol appears in both the FIAT and the CRYPTO set.
    #[error("Currency {0} is configured as both FIAT and CRYPTO")]
    OverlappingCurrency(String),

    /// A symbol is empty or contains characters other than ASCII alphanumerics.
    #[error("Invalid currency symbol: '{0}'")]
    InvalidSymbol(String),

    /// Fee basis points outside `0..=10000`.
    #[error("Fee basis points must be between 0 and 10000, got {0}")]
    FeeOutOfRange(Decimal),

    /// Precision larger than a decimal can represent.
    #[error("Precision {0} exceeds the maximum of 28 decimal places")]
    PrecisionOutOfRange(u32),
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Pricing and precision configuration.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Stale transaction cleanup configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Exchange rate provider configuration.
    #[serde(default)]
    pub rates: RatesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Rounding applied wherever an amount is cut down to a currency's precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    HalfEven,
    /// Round to nearest, ties away from zero.
    #[default]
    HalfUp,
    /// Drop extra digits.
    Truncate,
}

impl RoundingMode {
    /// Returns the matching `rust_decimal` strategy.
    #[must_use]
    pub const fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Self::Truncate => RoundingStrategy::ToZero,
        }
    }
}

/// Pricing configuration consumed by the amount calculator.
///
/// Passed explicitly to the calculator; nothing reads it from ambient state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Fee applied to card payments, in parts per ten thousand.
    pub fee_basis_points: Decimal,
    /// Decimal places for FIAT amounts.
    pub fiat_precision: u32,
    /// Decimal places for CRYPTO amounts.
    pub crypto_precision: u32,
    /// Known FIAT symbols.
    pub fiat_currencies: Vec<String>,
    /// Known CRYPTO symbols.
    pub crypto_currencies: Vec<String>,
    /// Rounding mode for every precision cut.
    pub rounding: RoundingMode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fee_basis_points: Decimal::ZERO,
            fiat_precision: 4,
            crypto_precision: 8,
            fiat_currencies: ["USD", "EUR", "GBP", "CHF"].map(String::from).to_vec(),
            crypto_currencies: ["ETH", "BTC", "USDC", "USDT", "MATIC", "BNB", "SOL"]
                .map(String::from)
                .to_vec(),
            rounding: RoundingMode::default(),
        }
    }
}

impl PricingConfig {
    /// Checks the currency sets, precisions and fee rate.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for precision in [self.fiat_precision, self.crypto_precision] {
            if precision > MAX_PRECISION {
                return Err(ConfigError::PrecisionOutOfRange(precision));
            }
        }

        if self.fee_basis_points.is_sign_negative()
            || self.fee_basis_points > Decimal::from(MAX_FEE_BASIS_POINTS)
        {
            return Err(ConfigError::FeeOutOfRange(self.fee_basis_points));
        }

        if self.fiat_currencies.is_empty() {
            return Err(ConfigError::EmptyCurrencySet(CurrencyClass::Fiat));
        }
        if self.crypto_currencies.is_empty() {
            return Err(ConfigError::EmptyCurrencySet(CurrencyClass::Crypto));
        }

        let mut fiat = HashSet::new();
        for symbol in &self.fiat_currencies {
            fiat.insert(normalize_symbol(symbol)?);
        }
        for symbol in &self.crypto_currencies {
            let symbol = normalize_symbol(symbol)?;
            if fiat.contains(&symbol) {
                return Err(ConfigError::OverlappingCurrency(symbol));
            }
        }

        Ok(())
    }

}

/// Upper-cases a symbol and rejects empty or non-alphanumeric ones.
///
/// # Errors
///
/// Returns `ConfigError::InvalidSymbol` for malformed symbols.
pub fn normalize_symbol(symbol: &str) -> Result<String, ConfigError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidSymbol(symbol.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Stale transaction cleanup configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Whether the server runs the periodic sweep.
    pub enabled: bool,
    /// Age after which unconfirmed transactions are cancelled.
    pub max_age_hours: u32,
    /// Seconds between sweeps.
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_hours: 6,
            interval_secs: 3600, // hourly
        }
    }
}

/// Exchange rate provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Endpoint returning the full rate table as JSON.
    pub url: String,
    /// Optional API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8090/rates".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TOKENSALE").separator("__"))
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.pricing.validate()?;
        Ok(app_config)
    }
}
