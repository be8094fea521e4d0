//! Persistence seam for sales, users and transactions.
//!
//! Every read-validate-write sequence runs inside one [`StoreTransaction`]:
//! reads observe the unit's own writes, nothing is visible to other units
//! before [`StoreTransaction::commit`], and dropping an uncommitted unit
//! discards its writes.
//!
//! Implementations must serialise units that touch the same sale, so that
//! two concurrent purchases can neither oversell it nor both pass the
//! one-in-flight-purchase check.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokensale_shared::types::{SaleId, TransactionId, UserId};

use crate::sale::{Sale, SaleStatus};
use crate::transaction::types::{StatusPayload, Transaction, TransactionStatus};
use crate::user::User;

pub use error::StoreError;
pub use memory::MemoryStore;

/// Opens atomic units of work.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Starts a unit of work.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// One atomic unit of work. Rolled back on drop unless committed.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Finds a user by ID.
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Finds a sale by ID, locking it for the rest of the unit.
    async fn find_sale(&mut self, id: SaleId) -> Result<Option<Sale>, StoreError>;

    /// Finds the PENDING or AWAITING_PAYMENT transaction of a user in a sale.
    async fn find_pending_transaction(
        &mut self,
        user_id: UserId,
        sale_id: SaleId,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Finds a transaction by ID, locking it for the rest of the unit.
    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Lists PENDING and AWAITING_PAYMENT transactions created before `cutoff`.
    async fn find_stale_transactions(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Lists OPEN sales.
    async fn find_open_sales(&mut self) -> Result<Vec<Sale>, StoreError>;

    /// Inserts a transaction.
    ///
    /// Fails with `Conflict` if the user already has an in-flight
    /// transaction in the same sale.
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Adds `delta` to the sale's available quantity and returns the sale.
    ///
    /// Fails with `Conflict` if the result would be negative.
    async fn update_sale_quantity(&mut self, id: SaleId, delta: Decimal) -> Result<Sale, StoreError>;

    /// Sets the sale status and returns the sale.
    async fn update_sale_status(&mut self, id: SaleId, status: SaleStatus) -> Result<Sale, StoreError>;

    /// Sets the transaction status and returns the transaction.
    ///
    /// Each `Some` field of `fields` overwrites the stored value; `None`
    /// leaves it untouched. `comment` replaces the whole comment.
    async fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
        fields: &StatusPayload,
    ) -> Result<Transaction, StoreError>;

    /// Makes the unit's writes visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
