//! Transaction error types.

use std::fmt;

use thiserror::Error;

use crate::currency::CurrencyError;
use crate::store::StoreError;
use crate::transaction::types::TransactionStatus;

/// Why a creation or status update was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationReason {
    /// A required field is missing or malformed.
    InvalidData,
    /// No user with the given ID.
    UserNotFound,
    /// No sale with the given ID.
    SaleNotFound,
    /// Sale status is not OPEN.
    SaleNotOpen,
    /// Sale closing date has passed.
    SaleExpired,
    /// Quantity exceeds the available tokens.
    InsufficientTokens,
    /// Quantity below the sale minimum.
    BelowMinimum,
    /// Quantity above the per-user maximum.
    AboveMaximum,
    /// User already has a PENDING or AWAITING_PAYMENT purchase in the sale.
    PendingTransactionExists,
    /// SAFT requires an email, or a verified one.
    SaftPrerequisitesNotMet,
    /// KYC requires a verified email.
    KycPrerequisitesNotMet,
    /// No transaction with the given ID.
    TransactionNotFound,
    /// PAYMENT_SUBMITTED without payment evidence.
    EvidenceRequired,
    /// REJECTED without a rejection reason.
    ReasonRequired,
    /// Client total differs from the computed total.
    AmountMismatch,
}

impl ValidationReason {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidData => "invalid_data",
            Self::UserNotFound => "user_not_found",
            Self::SaleNotFound => "sale_not_found",
            Self::SaleNotOpen => "sale_not_open",
            Self::SaleExpired => "sale_expired",
            Self::InsufficientTokens => "insufficient_tokens",
            Self::BelowMinimum => "below_minimum",
            Self::AboveMaximum => "above_maximum",
            Self::PendingTransactionExists => "pending_transaction_exists",
            Self::SaftPrerequisitesNotMet => "saft_prerequisites_not_met",
            Self::KycPrerequisitesNotMet => "kyc_prerequisites_not_met",
            Self::TransactionNotFound => "transaction_not_found",
            Self::EvidenceRequired => "evidence_required",
            Self::ReasonRequired => "reason_required",
            Self::AmountMismatch => "amount_mismatch",
        }
    }

    /// User-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidData => "Invalid transaction data",
            Self::UserNotFound => "User not found",
            Self::SaleNotFound => "Sale not found",
            Self::SaleNotOpen => "Sale is not open",
            Self::SaleExpired => "Sale has expired",
            Self::InsufficientTokens => "Not enough tokens available",
            Self::BelowMinimum => "Quantity is below the sale minimum",
            Self::AboveMaximum => "Quantity is above the sale maximum per user",
            Self::PendingTransactionExists => {
                "A pending transaction already exists for this user and sale"
            }
            Self::SaftPrerequisitesNotMet => "SAFT prerequisites not met",
            Self::KycPrerequisitesNotMet => "KYC prerequisites not met",
            Self::TransactionNotFound => "Transaction not found",
            Self::EvidenceRequired => "Payment evidence is required",
            Self::ReasonRequired => "Rejection reason is required",
            Self::AmountMismatch => "Total amount does not match the computed amount",
        }
    }

    const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound | Self::SaleNotFound | Self::TransactionNotFound
        )
    }

    const fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidData | Self::EvidenceRequired | Self::ReasonRequired | Self::AmountMismatch
        )
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Refusal carrying the reason and, when there is one, the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct TransactionValidationError {
    /// Why the request was refused.
    pub reason: ValidationReason,
    /// Request field at fault.
    pub field: Option<&'static str>,
}

impl TransactionValidationError {
    /// Creates an error without a field.
    #[must_use]
    pub const fn new(reason: ValidationReason) -> Self {
        Self {
            reason,
            field: None,
        }
    }

    /// Creates an error pointing at a request field.
    #[must_use]
    pub const fn with_field(reason: ValidationReason, field: &'static str) -> Self {
        Self {
            reason,
            field: Some(field),
        }
    }
}

impl From<ValidationReason> for TransactionValidationError {
    fn from(reason: ValidationReason) -> Self {
        Self::new(reason)
    }
}

/// Errors that can occur while creating or updating transactions.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Request refused by a business rule.
    #[error(transparent)]
    Validation(#[from] TransactionValidationError),

    /// Status change not in the transition table.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// Pricing failed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransactionError {
    /// Returns the validation reason, if this is a validation failure.
    #[must_use]
    pub const fn reason(&self) -> Option<ValidationReason> {
        match self {
            Self::Validation(err) => Some(err.reason),
            _ => None,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(err) if err.reason.is_not_found() => 404,
            Self::Validation(err) if err.reason.is_bad_input() => 400,
            Self::Validation(_) | Self::InvalidStatusTransition { .. } => 422,
            Self::Currency(err) => err.status_code(),
            Self::Store(err) => err.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "TRANSACTION_VALIDATION_ERROR",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::Currency(err) => err.error_code(),
            Self::Store(err) => err.error_code(),
        }
    }
}

impl From<ValidationReason> for TransactionError {
    fn from(reason: ValidationReason) -> Self {
        Self::Validation(reason.into())
    }
}
