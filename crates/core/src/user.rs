//! Buyers.

use serde::{Deserialize, Serialize};
use tokensale_shared::types::UserId;

/// Outcome of a KYC check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    /// Documents submitted, not reviewed.
    Pending,
    /// Identity confirmed.
    Verified,
    /// Documents refused.
    Rejected,
}

/// A buyer identified by wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Wallet receiving purchased tokens.
    pub wallet_address: String,
    /// Contact email.
    pub email: Option<String>,
    /// Whether `email` has been confirmed.
    pub email_verified: bool,
    /// Display name.
    pub name: Option<String>,
    /// Latest KYC outcome, if any.
    pub kyc_status: Option<KycStatus>,
}

impl User {
    /// Returns true if the user has a non-blank email.
    #[must_use]
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// Returns true if the user has a non-blank, verified email.
    #[must_use]
    pub fn has_verified_email(&self) -> bool {
        self.has_email() && self.email_verified
    }
}
