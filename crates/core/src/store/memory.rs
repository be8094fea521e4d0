//! In-memory store.
//!
//! Units of work are fully serialised: `begin` takes the single lock and
//! works on a copy of the state, `commit` writes the copy back. Used by the
//! core and API tests; the server always runs on the database store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokensale_shared::types::{SaleId, TransactionId, UserId};

use super::{SaleStore, StoreError, StoreTransaction};
use crate::sale::{Sale, SaleStatus};
use crate::transaction::types::{StatusPayload, Transaction, TransactionStatus};
use crate::user::User;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    sales: HashMap<SaleId, Sale>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn put_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Adds or replaces a sale.
    pub async fn put_sale(&self, sale: Sale) {
        self.state.lock().await.sales.insert(sale.id, sale);
    }

    /// Adds or replaces a transaction without any constraint check.
    pub async fn put_transaction(&self, transaction: Transaction) {
        self.state
            .lock()
            .await
            .transactions
            .insert(transaction.id, transaction);
    }

    /// Returns the committed state of a sale.
    pub async fn sale(&self, id: SaleId) -> Option<Sale> {
        self.state.lock().await.sales.get(&id).cloned()
    }

    /// Returns the committed state of a transaction.
    pub async fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.state.lock().await.transactions.get(&id).cloned()
    }

    /// Returns every committed transaction, oldest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self
            .state
            .lock()
            .await
            .transactions
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|t| (t.created_at, t.id));
        all
    }
}

#[async_trait]
impl SaleStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_sale(&mut self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        Ok(self.working.sales.get(&id).cloned())
    }

    async fn find_pending_transaction(
        &mut self,
        user_id: UserId,
        sale_id: SaleId,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .working
            .transactions
            .values()
            .find(|t| t.user_id == user_id && t.sale_id == sale_id && t.status.is_in_flight())
            .cloned())
    }

    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.working.transactions.get(&id).cloned())
    }

    async fn find_stale_transactions(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut stale: Vec<Transaction> = self
            .working
            .transactions
            .values()
            .filter(|t| t.status.is_in_flight() && t.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|t| (t.created_at, t.id));
        Ok(stale)
    }

    async fn find_open_sales(&mut self) -> Result<Vec<Sale>, StoreError> {
        let mut open: Vec<Sale> = self
            .working
            .sales
            .values()
            .filter(|s| s.status == SaleStatus::Open)
            .cloned()
            .collect();
        open.sort_by_key(|s| s.id);
        Ok(open)
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        if self.working.transactions.contains_key(&transaction.id) {
            return Err(StoreError::Conflict(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        if transaction.status.is_in_flight() {
            let duplicate = self.working.transactions.values().any(|t| {
                t.user_id == transaction.user_id
                    && t.sale_id == transaction.sale_id
                    && t.status.is_in_flight()
            });
            if duplicate {
                return Err(StoreError::Conflict(
                    "user already has a pending transaction in this sale".to_string(),
                ));
            }
        }
        self.working
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn update_sale_quantity(&mut self, id: SaleId, delta: Decimal) -> Result<Sale, StoreError> {
        let sale = self
            .working
            .sales
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Sale {id}")))?;
        let available = sale.available_token_quantity + delta;
        if available.is_sign_negative() && !available.is_zero() {
            return Err(StoreError::Conflict(format!(
                "sale {id} has only {} tokens available",
                sale.available_token_quantity
            )));
        }
        sale.available_token_quantity = available;
        sale.updated_at = Utc::now();
        Ok(sale.clone())
    }

    async fn update_sale_status(&mut self, id: SaleId, status: SaleStatus) -> Result<Sale, StoreError> {
        let sale = self
            .working
            .sales
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Sale {id}")))?;
        sale.status = status;
        sale.updated_at = Utc::now();
        Ok(sale.clone())
    }

    async fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
        fields: &StatusPayload,
    ) -> Result<Transaction, StoreError> {
        let transaction = self
            .working
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Transaction {id}")))?;
        transaction.status = status;
        if let Some(evidence) = &fields.payment_evidence {
            transaction.payment_evidence = Some(evidence.clone());
        }
        if let Some(reason) = &fields.rejection_reason {
            transaction.rejection_reason = Some(reason.clone());
        }
        if let Some(comment) = &fields.comment {
            transaction.comment = Some(comment.clone());
        }
        transaction.updated_at = Utc::now();
        Ok(transaction.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
