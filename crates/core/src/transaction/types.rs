//! Transaction domain types.
//!
//! Status transitions:
//! - PENDING → AWAITING_PAYMENT → PAYMENT_SUBMITTED → PAYMENT_VERIFIED → COMPLETED
//! - PENDING | AWAITING_PAYMENT → CANCELLED
//! - PENDING | AWAITING_PAYMENT | PAYMENT_SUBMITTED → REJECTED

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokensale_shared::types::{SaleId, TransactionId, UserId};

/// Purchase status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Created, tokens reserved.
    Pending,
    /// Buyer confirmed, payment expected.
    AwaitingPayment,
    /// Buyer provided payment evidence.
    PaymentSubmitted,
    /// Admin verified the payment.
    PaymentVerified,
    /// Tokens delivered.
    Completed,
    /// Refused by an admin.
    Rejected,
    /// Abandoned or timed out.
    Cancelled,
}

impl TransactionStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::AwaitingPayment,
        Self::PaymentSubmitted,
        Self::PaymentVerified,
        Self::Completed,
        Self::Rejected,
        Self::Cancelled,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::PaymentSubmitted => "PAYMENT_SUBMITTED",
            Self::PaymentVerified => "PAYMENT_VERIFIED",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "AWAITING_PAYMENT" => Some(Self::AwaitingPayment),
            "PAYMENT_SUBMITTED" => Some(Self::PaymentSubmitted),
            "PAYMENT_VERIFIED" => Some(Self::PaymentVerified),
            "COMPLETED" => Some(Self::Completed),
            "REJECTED" => Some(Self::Rejected),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if `self → next` is in the transition table.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::AwaitingPayment)
                | (Self::AwaitingPayment, Self::PaymentSubmitted)
                | (Self::PaymentSubmitted, Self::PaymentVerified)
                | (Self::PaymentVerified, Self::Completed)
                | (Self::Pending | Self::AwaitingPayment, Self::Cancelled)
                | (
                    Self::Pending | Self::AwaitingPayment | Self::PaymentSubmitted,
                    Self::Rejected
                )
        )
    }

    /// Returns true while the transaction still holds a reservation and
    /// blocks another purchase by the same user in the same sale.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::AwaitingPayment)
    }

    /// Returns true if no transition leaves this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Returns true if entering this status gives the tokens back to the sale.
    #[must_use]
    pub const fn releases_tokens(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Form of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormOfPayment {
    /// Bank transfer.
    Transfer,
    /// Card through a payment provider.
    Card,
    /// On-chain payment.
    Crypto,
}

impl FormOfPayment {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "TRANSFER",
            Self::Card => "CARD",
            Self::Crypto => "CRYPTO",
        }
    }

    /// Parses a form of payment from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TRANSFER" => Some(Self::Transfer),
            "CARD" => Some(Self::Card),
            "CRYPTO" => Some(Self::Crypto),
            _ => None,
        }
    }

    /// Only card payments carry the processing fee.
    #[must_use]
    pub const fn adds_fee(&self) -> bool {
        matches!(self, Self::Card)
    }
}

impl fmt::Display for FormOfPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user's purchase in one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Buyer.
    pub user_id: UserId,
    /// Sale the tokens come from.
    pub sale_id: SaleId,
    /// Symbol of the purchased token.
    pub token_symbol: String,
    /// Tokens reserved by this purchase.
    pub quantity: Decimal,
    /// Form of payment.
    pub form_of_payment: FormOfPayment,
    /// Currency the buyer pays in.
    pub paid_currency: String,
    /// Token price in `paid_currency`.
    pub price: Decimal,
    /// Amount due, fees included.
    pub total_amount: Decimal,
    /// Fees included in `total_amount`.
    pub fees: Decimal,
    /// Current status.
    pub status: TransactionStatus,
    /// Proof of payment supplied with PAYMENT_SUBMITTED.
    pub payment_evidence: Option<String>,
    /// Reason supplied with REJECTED.
    pub rejection_reason: Option<String>,
    /// Free-form notes, appended to over time.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the comment with `line` appended on its own line.
    #[must_use]
    pub fn comment_with(&self, line: &str) -> String {
        match self.comment.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line.to_string(),
        }
    }
}

/// Purchase request as received from a caller.
///
/// Every field is optional so that a missing one is reported as a
/// validation failure rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTransactionData {
    /// Buyer.
    pub user_id: Option<UserId>,
    /// Sale to buy from.
    pub sale_id: Option<SaleId>,
    /// Token symbol; must match the sale.
    pub token_symbol: Option<String>,
    /// Tokens to buy.
    pub quantity: Option<Decimal>,
    /// Form of payment.
    pub form_of_payment: Option<FormOfPayment>,
    /// Amount the client computed; must match the server quote.
    pub total_amount: Option<Decimal>,
    /// Currency to pay in.
    pub paid_currency: Option<String>,
}

/// Creation request after the required-field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransactionInput {
    /// Buyer.
    pub user_id: UserId,
    /// Sale to buy from.
    pub sale_id: SaleId,
    /// Token symbol.
    pub token_symbol: String,
    /// Tokens to buy, strictly positive.
    pub quantity: Decimal,
    /// Form of payment.
    pub form_of_payment: FormOfPayment,
    /// Client-side total.
    pub total_amount: Decimal,
    /// Currency to pay in.
    pub paid_currency: String,
}

/// Extra fields written alongside a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusPayload {
    /// Proof of payment.
    pub payment_evidence: Option<String>,
    /// Reason for a rejection.
    pub rejection_reason: Option<String>,
    /// Line appended to the transaction comment.
    pub comment: Option<String>,
}
