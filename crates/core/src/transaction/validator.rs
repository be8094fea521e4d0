//! Business rules gating transaction creation and status changes.
//!
//! Every check that depends on "now" takes it as a parameter, so the rules
//! are deterministic under test.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::sale::{SaftRequirement, Sale, SaleStatus};
use crate::store::StoreTransaction;
use crate::transaction::error::{TransactionError, TransactionValidationError, ValidationReason};
use crate::transaction::types::{
    CreateTransactionData, CreateTransactionInput, FormOfPayment, StatusPayload, Transaction,
    TransactionStatus,
};
use crate::user::User;
use tokensale_shared::types::TransactionId;

/// Default age after which a pending transaction times out.
pub const DEFAULT_TIMEOUT_HOURS: u32 = 6;

/// Everything a successful creation check loaded.
#[derive(Debug, Clone)]
pub struct ValidatedCreation {
    /// Request with every required field present.
    pub input: CreateTransactionInput,
    /// Sale, locked for the rest of the unit.
    pub sale: Sale,
    /// Buyer.
    pub user: User,
    /// In-flight purchase of the same user in the same sale. Always `None`
    /// after a successful check.
    pub pending_transaction: Option<Transaction>,
}

/// Why a sale should stop accepting purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingReason {
    /// Closing date is in the past.
    ClosingDatePassed,
    /// No token left.
    SoldOut,
}

impl ClosingReason {
    /// Human-readable reason.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ClosingDatePassed => "Sale closing date has passed",
            Self::SoldOut => "All tokens have been sold",
        }
    }

    /// Status the sale moves to.
    #[must_use]
    pub const fn target_status(&self) -> SaleStatus {
        match self {
            Self::ClosingDatePassed => SaleStatus::Closed,
            Self::SoldOut => SaleStatus::Finished,
        }
    }
}

/// Result of [`TransactionValidator::validate_sale_closing_conditions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingDecision {
    /// Whether the sale should close.
    pub should_close: bool,
    /// Set when `should_close` is true.
    pub reason: Option<ClosingReason>,
}

/// Why a transaction timed out. Only affects the diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReason {
    /// Crypto payment never arrived.
    CryptoPendingTooLong,
    /// Transfer or card payment never arrived.
    NonCryptoPendingTooLong,
}

impl TimeoutReason {
    /// Human-readable reason.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::CryptoPendingTooLong => "Crypto transaction pending for too long",
            Self::NonCryptoPendingTooLong => "Non-crypto transaction pending for too long",
        }
    }
}

/// Result of [`TransactionValidator::validate_transaction_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutDecision {
    /// Whether the transaction is older than the timeout.
    pub should_timeout: bool,
    /// Set when `should_timeout` is true.
    pub reason: Option<TimeoutReason>,
}

/// Stateless rule engine.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Checks that every required field is present and the quantity is positive.
    pub fn check_required_fields(
        data: &CreateTransactionData,
    ) -> Result<CreateTransactionInput, TransactionValidationError> {
        let missing = |field| TransactionValidationError::with_field(ValidationReason::InvalidData, field);

        let user_id = data.user_id.ok_or_else(|| missing("user_id"))?;
        let sale_id = data.sale_id.ok_or_else(|| missing("sale_id"))?;
        let token_symbol = non_blank(data.token_symbol.as_deref()).ok_or_else(|| missing("token_symbol"))?;
        let quantity = data
            .quantity
            .filter(|q| *q > Decimal::ZERO)
            .ok_or_else(|| missing("quantity"))?;
        let form_of_payment = data.form_of_payment.ok_or_else(|| missing("form_of_payment"))?;
        let total_amount = data
            .total_amount
            .filter(|a| !a.is_sign_negative())
            .ok_or_else(|| missing("total_amount"))?;
        let paid_currency =
            non_blank(data.paid_currency.as_deref()).ok_or_else(|| missing("paid_currency"))?;

        Ok(CreateTransactionInput {
            user_id,
            sale_id,
            token_symbol: token_symbol.to_ascii_uppercase(),
            quantity,
            form_of_payment,
            total_amount,
            paid_currency: paid_currency.to_ascii_uppercase(),
        })
    }

    /// Runs the creation checks in order and stops at the first failure.
    ///
    /// 1. required fields
    /// 2. user exists
    /// 3. sale exists and sells the requested token
    /// 4. sale is OPEN
    /// 5. closing date not passed, whatever the status says
    /// 6. quantity within available tokens
    /// 7. quantity at least the minimum
    /// 8. quantity at most the per-user maximum
    /// 9. no in-flight purchase by the user in the sale
    /// 10. SAFT email prerequisites
    /// 11. KYC verified email
    pub async fn validate_transaction_creation(
        store: &mut dyn StoreTransaction,
        data: &CreateTransactionData,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCreation, TransactionError> {
        let input = Self::check_required_fields(data)?;

        let user = store
            .find_user(input.user_id)
            .await?
            .ok_or_else(|| TransactionValidationError::with_field(ValidationReason::UserNotFound, "user_id"))?;

        let sale = store
            .find_sale(input.sale_id)
            .await?
            .ok_or_else(|| TransactionValidationError::with_field(ValidationReason::SaleNotFound, "sale_id"))?;

        if !input.token_symbol.eq_ignore_ascii_case(sale.token_symbol.trim()) {
            return Err(TransactionValidationError::with_field(
                ValidationReason::InvalidData,
                "token_symbol",
            )
            .into());
        }

        if sale.status != SaleStatus::Open {
            return Err(ValidationReason::SaleNotOpen.into());
        }

        Self::validate_sale_date_not_expired(&sale, now)?;

        Self::check_quantity(&sale, input.quantity)?;

        let pending_transaction = store
            .find_pending_transaction(input.user_id, input.sale_id)
            .await?;
        if pending_transaction.is_some() {
            return Err(ValidationReason::PendingTransactionExists.into());
        }

        Self::check_saft(&sale, &user)?;

        if sale.requires_kyc && !user.has_verified_email() {
            return Err(ValidationReason::KycPrerequisitesNotMet.into());
        }

        debug!(
            user_id = %input.user_id,
            sale_id = %input.sale_id,
            quantity = %input.quantity,
            "Transaction creation validated"
        );

        Ok(ValidatedCreation {
            input,
            sale,
            user,
            pending_transaction,
        })
    }

    /// Checks a requested status change against the transition table.
    pub fn validate_transition(
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), TransactionError> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransactionError::InvalidStatusTransition { from, to })
        }
    }

    /// Loads a transaction and checks that it may move to `new_status`
    /// with the given payload.
    pub async fn validate_transaction_status_update(
        store: &mut dyn StoreTransaction,
        id: TransactionId,
        new_status: TransactionStatus,
        payload: &StatusPayload,
    ) -> Result<Transaction, TransactionError> {
        let transaction = store
            .find_transaction(id)
            .await?
            .ok_or(ValidationReason::TransactionNotFound)?;

        Self::validate_transition(transaction.status, new_status)?;

        match new_status {
            TransactionStatus::PaymentSubmitted
                if non_blank(payload.payment_evidence.as_deref()).is_none() =>
            {
                Err(TransactionValidationError::with_field(
                    ValidationReason::EvidenceRequired,
                    "payment_evidence",
                )
                .into())
            }
            TransactionStatus::Rejected
                if non_blank(payload.rejection_reason.as_deref()).is_none() =>
            {
                Err(TransactionValidationError::with_field(
                    ValidationReason::ReasonRequired,
                    "rejection_reason",
                )
                .into())
            }
            _ => Ok(transaction),
        }
    }

    /// Decides whether a sale should stop accepting purchases.
    ///
    /// The closing date wins when the sale is also sold out.
    #[must_use]
    pub fn validate_sale_closing_conditions(sale: &Sale, now: DateTime<Utc>) -> ClosingDecision {
        let reason = if now > sale.sale_closing_date {
            Some(ClosingReason::ClosingDatePassed)
        } else if sale.is_sold_out() {
            Some(ClosingReason::SoldOut)
        } else {
            None
        };
        ClosingDecision {
            should_close: reason.is_some(),
            reason,
        }
    }

    /// Decides whether a transaction has been waiting longer than
    /// `timeout_hours`. The threshold is the same for every form of payment.
    #[must_use]
    pub fn validate_transaction_timeout(
        transaction: &Transaction,
        timeout_hours: u32,
        now: DateTime<Utc>,
    ) -> TimeoutDecision {
        if now - transaction.created_at <= Duration::hours(i64::from(timeout_hours)) {
            return TimeoutDecision {
                should_timeout: false,
                reason: None,
            };
        }
        let reason = if transaction.form_of_payment == FormOfPayment::Crypto {
            TimeoutReason::CryptoPendingTooLong
        } else {
            TimeoutReason::NonCryptoPendingTooLong
        };
        TimeoutDecision {
            should_timeout: true,
            reason: Some(reason),
        }
    }

    /// Guard failing once the sale's closing date is at or before `now`.
    pub fn validate_sale_date_not_expired(
        sale: &Sale,
        now: DateTime<Utc>,
    ) -> Result<(), TransactionValidationError> {
        if sale.is_expired_at(now) {
            return Err(ValidationReason::SaleExpired.into());
        }
        Ok(())
    }

    fn check_quantity(sale: &Sale, quantity: Decimal) -> Result<(), TransactionValidationError> {
        let reject = |reason| TransactionValidationError::with_field(reason, "quantity");

        if quantity > sale.available_token_quantity {
            return Err(reject(ValidationReason::InsufficientTokens));
        }
        if sale.minimum_token_buy_per_user.is_some_and(|min| quantity < min) {
            return Err(reject(ValidationReason::BelowMinimum));
        }
        if sale.maximum_token_buy_per_user.is_some_and(|max| quantity > max) {
            return Err(reject(ValidationReason::AboveMaximum));
        }
        Ok(())
    }

    fn check_saft(sale: &Sale, user: &User) -> Result<(), TransactionValidationError> {
        let met = match sale.saft {
            SaftRequirement::NotRequired => true,
            SaftRequirement::Required => user.has_email(),
            SaftRequirement::RequiredVerifiedEmail => user.has_verified_email(),
        };
        if met {
            Ok(())
        } else {
            Err(ValidationReason::SaftPrerequisitesNotMet.into())
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
