//! Sale domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokensale_shared::types::SaleId;

/// Sale lifecycle status.
///
/// - Created → Open (admin)
/// - Open → Closed (closing date passed or admin)
/// - Open → Finished (sold out)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    /// Configured but not yet accepting purchases.
    Created,
    /// Accepting purchases.
    Open,
    /// No longer accepting purchases.
    Closed,
    /// Every token has been sold.
    Finished,
}

impl SaleStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Finished => "FINISHED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Some(Self::Created),
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            "FINISHED" => Some(Self::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a buyer must provide before signing the SAFT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaftRequirement {
    /// No SAFT for this sale.
    #[default]
    NotRequired,
    /// Buyer needs an email address.
    Required,
    /// Buyer needs a verified email address.
    RequiredVerifiedEmail,
}

impl SaftRequirement {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequired => "NOT_REQUIRED",
            Self::Required => "REQUIRED",
            Self::RequiredVerifiedEmail => "REQUIRED_VERIFIED_EMAIL",
        }
    }

    /// Parses a requirement from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NOT_REQUIRED" => Some(Self::NotRequired),
            "REQUIRED" => Some(Self::Required),
            "REQUIRED_VERIFIED_EMAIL" => Some(Self::RequiredVerifiedEmail),
            _ => None,
        }
    }

    /// Returns true if a SAFT must be signed.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !matches!(self, Self::NotRequired)
    }
}

/// A token offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Sale ID.
    pub id: SaleId,
    /// Display name.
    pub name: String,
    /// Symbol of the token on offer.
    pub token_symbol: String,
    /// Lifecycle status.
    pub status: SaleStatus,
    /// Tokens offered in total.
    pub initial_token_quantity: Decimal,
    /// Tokens not yet reserved. Single source of truth for remaining supply.
    pub available_token_quantity: Decimal,
    /// Smallest purchase allowed.
    pub minimum_token_buy_per_user: Option<Decimal>,
    /// Largest purchase allowed.
    pub maximum_token_buy_per_user: Option<Decimal>,
    /// Price of one token in `currency`.
    pub token_price_per_unit: Decimal,
    /// Currency the price is quoted in.
    pub currency: String,
    /// After this instant no purchase is accepted.
    pub sale_closing_date: DateTime<Utc>,
    /// Buyers need a verified email for KYC.
    pub requires_kyc: bool,
    /// SAFT prerequisites.
    pub saft: SaftRequirement,
    /// Wallet receiving crypto payments.
    pub to_wallet_address: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns true if no token is left.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.available_token_quantity <= Decimal::ZERO
    }

    /// Returns true if the closing date is at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.sale_closing_date <= now
    }
}
