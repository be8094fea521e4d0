//! Time-based sweeps: stale transaction cancellation and sale closing.
//!
//! Candidates are listed in one read, then each one is re-checked and
//! updated in its own store unit. A failing item is recorded and the sweep
//! moves on.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokensale_shared::types::{SaleId, TransactionId};
use tokensale_shared::CleanupConfig;
use tracing::{info, warn};

use crate::sale::SaleStatus;
use crate::store::{SaleStore, StoreError};
use crate::transaction::error::TransactionError;
use crate::transaction::types::{FormOfPayment, StatusPayload, Transaction, TransactionStatus};
use crate::transaction::validator::{TransactionValidator, DEFAULT_TIMEOUT_HOURS};

/// Comment appended to transactions cancelled by the sweep.
pub const CANCELLATION_COMMENT: &str =
    "Transaction cancelled for not being confirmed after time limit";

/// One item the sweep could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure<Id> {
    /// Item ID.
    pub id: Id,
    /// Error message.
    pub message: String,
}

/// Aggregate outcome of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport<Id> {
    /// Candidates examined.
    pub processed: usize,
    /// Items updated.
    pub succeeded: Vec<Id>,
    /// Items no longer eligible when re-checked.
    pub skipped: Vec<Id>,
    /// Items that failed.
    pub failed: Vec<SweepFailure<Id>>,
}

impl<Id> Default for SweepReport<Id> {
    fn default() -> Self {
        Self {
            processed: 0,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<Id> SweepReport<Id> {
    /// Returns true if no item failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<E: std::fmt::Display>(&mut self, id: Id, outcome: Result<bool, E>) {
        self.processed += 1;
        match outcome {
            Ok(true) => self.succeeded.push(id),
            Ok(false) => self.skipped.push(id),
            Err(err) => self.failed.push(SweepFailure {
                id,
                message: err.to_string(),
            }),
        }
    }
}

/// Rules for the periodic sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    max_age_hours: u32,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_HOURS)
    }
}

impl LifecyclePolicy {
    /// Creates a policy cancelling transactions older than `max_age_hours`.
    #[must_use]
    pub const fn new(max_age_hours: u32) -> Self {
        Self { max_age_hours }
    }

    /// Creates a policy from the cleanup configuration.
    #[must_use]
    pub const fn from_config(config: &CleanupConfig) -> Self {
        Self::new(config.max_age_hours)
    }

    /// Configured age threshold in hours.
    #[must_use]
    pub const fn max_age_hours(&self) -> u32 {
        self.max_age_hours
    }

    /// Transactions created before this instant are old enough to cancel.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(i64::from(self.max_age_hours))
    }

    /// Returns true if the sweep may cancel `transaction` at `now`.
    ///
    /// PENDING always qualifies once old enough. AWAITING_PAYMENT qualifies
    /// unless paid by card: those wait on the payment provider and are never
    /// cancelled automatically, whatever their age.
    #[must_use]
    pub fn is_eligible_for_cancellation(&self, transaction: &Transaction, now: DateTime<Utc>) -> bool {
        let status_eligible = match transaction.status {
            TransactionStatus::Pending => true,
            TransactionStatus::AwaitingPayment => transaction.form_of_payment != FormOfPayment::Card,
            _ => false,
        };
        status_eligible
            && TransactionValidator::validate_transaction_timeout(transaction, self.max_age_hours, now)
                .should_timeout
    }

    /// Cancels every eligible stale transaction and gives its tokens back.
    ///
    /// # Errors
    ///
    /// Only listing the candidates is fatal; per-item failures end up in
    /// the report.
    pub async fn cancel_stale_transactions(
        &self,
        store: &dyn SaleStore,
        now: DateTime<Utc>,
    ) -> Result<SweepReport<TransactionId>, StoreError> {
        let candidates = {
            let mut tx = store.begin().await?;
            tx.find_stale_transactions(self.cutoff(now)).await?
        };

        let mut report = SweepReport::default();
        for candidate in candidates {
            if !self.is_eligible_for_cancellation(&candidate, now) {
                continue;
            }
            let outcome = self.cancel_one(store, candidate.id, now).await;
            if let Err(err) = &outcome {
                warn!(transaction_id = %candidate.id, error = %err, "Failed to cancel stale transaction");
            }
            report.record(candidate.id, outcome);
        }

        info!(
            processed = report.processed,
            cancelled = report.succeeded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Stale transaction sweep finished"
        );
        Ok(report)
    }

    /// Re-reads the transaction inside the unit so that a concurrent payment
    /// submission wins over the sweep.
    async fn cancel_one(
        &self,
        store: &dyn SaleStore,
        id: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<bool, TransactionError> {
        let mut tx = store.begin().await?;
        let Some(current) = tx.find_transaction(id).await? else {
            return Ok(false);
        };
        if !self.is_eligible_for_cancellation(&current, now) {
            return Ok(false);
        }
        TransactionValidator::validate_transition(current.status, TransactionStatus::Cancelled)?;

        let fields = StatusPayload {
            comment: Some(current.comment_with(CANCELLATION_COMMENT)),
            ..StatusPayload::default()
        };
        tx.update_transaction_status(id, TransactionStatus::Cancelled, &fields)
            .await?;
        tx.update_sale_quantity(current.sale_id, current.quantity)
            .await?;
        tx.commit().await?;

        info!(
            transaction_id = %id,
            sale_id = %current.sale_id,
            quantity = %current.quantity,
            "Stale transaction cancelled"
        );
        Ok(true)
    }

    /// Closes OPEN sales whose closing date passed (CLOSED) or that sold
    /// out (FINISHED).
    ///
    /// # Errors
    ///
    /// Only listing the open sales is fatal.
    pub async fn close_sales(
        &self,
        store: &dyn SaleStore,
        now: DateTime<Utc>,
    ) -> Result<SweepReport<SaleId>, StoreError> {
        let open_sales = {
            let mut tx = store.begin().await?;
            tx.find_open_sales().await?
        };

        let mut report = SweepReport::default();
        for sale in open_sales {
            if !TransactionValidator::validate_sale_closing_conditions(&sale, now).should_close {
                continue;
            }
            let outcome = close_one(store, sale.id, now).await;
            if let Err(err) = &outcome {
                warn!(sale_id = %sale.id, error = %err, "Failed to close sale");
            }
            report.record(sale.id, outcome);
        }

        info!(
            processed = report.processed,
            closed = report.succeeded.len(),
            failed = report.failed.len(),
            "Sale closing sweep finished"
        );
        Ok(report)
    }
}

async fn close_one(store: &dyn SaleStore, id: SaleId, now: DateTime<Utc>) -> Result<bool, StoreError> {
    let mut tx = store.begin().await?;
    let Some(sale) = tx.find_sale(id).await? else {
        return Ok(false);
    };
    if sale.status != SaleStatus::Open {
        return Ok(false);
    }
    let Some(reason) = TransactionValidator::validate_sale_closing_conditions(&sale, now).reason else {
        return Ok(false);
    };

    tx.update_sale_status(id, reason.target_status()).await?;
    tx.commit().await?;

    info!(sale_id = %id, reason = reason.message(), "Sale closed");
    Ok(true)
}
