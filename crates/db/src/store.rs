//! PostgreSQL implementation of the sale store.
//!
//! Each unit of work is one database transaction. Sale and transaction
//! reads take row locks (`SELECT ... FOR UPDATE`), so two purchases in the
//! same sale run one after the other. The partial unique index on
//! in-flight transactions backs the one-purchase-per-user rule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tokensale_core::sale::{Sale, SaleStatus};
use tokensale_core::store::{SaleStore, StoreError, StoreTransaction};
use tokensale_core::transaction::{StatusPayload, Transaction, TransactionStatus};
use tokensale_core::user::User;
use tokensale_shared::types::{SaleId, TransactionId, UserId};
use tracing::error;

use crate::entities::sea_orm_active_enums as db_enums;
use crate::entities::{sales, transactions, users};

/// Sale store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Creates a store on top of an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SaleStore for SeaOrmStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let txn = self.db.begin().await.map_err(backend)?;
        Ok(Box::new(SeaOrmTransaction { txn }))
    }
}

/// One database transaction. Dropping it without commit rolls back.
pub struct SeaOrmTransaction {
    txn: DatabaseTransaction,
}

impl SeaOrmTransaction {
    async fn locked_sale(&self, id: SaleId) -> Result<sales::Model, StoreError> {
        sales::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("Sale {id}")))
    }

    async fn locked_transaction(&self, id: TransactionId) -> Result<transactions::Model, StoreError> {
        transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("Transaction {id}")))
    }
}

#[async_trait]
impl StoreTransaction for SeaOrmTransaction {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        let model = users::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(backend)?;
        Ok(model.map(User::from))
    }

    async fn find_sale(&mut self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        let model = sales::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(backend)?;
        Ok(model.map(Sale::from))
    }

    async fn find_pending_transaction(
        &mut self,
        user_id: UserId,
        sale_id: SaleId,
    ) -> Result<Option<Transaction>, StoreError> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.into_inner()))
            .filter(transactions::Column::SaleId.eq(sale_id.into_inner()))
            .filter(transactions::Column::Status.is_in(in_flight_statuses()))
            .one(&self.txn)
            .await
            .map_err(backend)?;
        Ok(model.map(Transaction::from))
    }

    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(backend)?;
        Ok(model.map(Transaction::from))
    }

    async fn find_stale_transactions(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::Status.is_in(in_flight_statuses()))
            .filter(transactions::Column::CreatedAt.lt(cutoff))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(backend)?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }

    async fn find_open_sales(&mut self) -> Result<Vec<Sale>, StoreError> {
        let models = sales::Entity::find()
            .filter(sales::Column::Status.eq(db_enums::SaleStatus::Open))
            .order_by_asc(sales::Column::Id)
            .all(&self.txn)
            .await
            .map_err(backend)?;
        Ok(models.into_iter().map(Sale::from).collect())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        transactions::ActiveModel::from(transaction)
            .insert(&self.txn)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
                _ => backend(err),
            })?;
        Ok(())
    }

    async fn update_sale_quantity(&mut self, id: SaleId, delta: Decimal) -> Result<Sale, StoreError> {
        let sale = self.locked_sale(id).await?;
        let available = sale.available_token_quantity + delta;
        if available < Decimal::ZERO {
            return Err(StoreError::Conflict(format!(
                "sale {id} has only {} tokens available",
                sale.available_token_quantity
            )));
        }

        let mut active = sale.into_active_model();
        active.available_token_quantity = Set(available);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.txn).await.map_err(backend)?;
        Ok(updated.into())
    }

    async fn update_sale_status(&mut self, id: SaleId, status: SaleStatus) -> Result<Sale, StoreError> {
        let sale = self.locked_sale(id).await?;
        let mut active = sale.into_active_model();
        active.status = Set(status.into());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.txn).await.map_err(backend)?;
        Ok(updated.into())
    }

    async fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
        fields: &StatusPayload,
    ) -> Result<Transaction, StoreError> {
        let current = self.locked_transaction(id).await?;
        let mut active = current.into_active_model();
        active.status = Set(status.into());
        if let Some(evidence) = &fields.payment_evidence {
            active.payment_evidence = Set(Some(evidence.clone()));
        }
        if let Some(reason) = &fields.rejection_reason {
            active.rejection_reason = Set(Some(reason.clone()));
        }
        if let Some(comment) = &fields.comment {
            active.comment = Set(Some(comment.clone()));
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.txn).await.map_err(backend)?;
        Ok(updated.into())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(backend)
    }
}

fn in_flight_statuses() -> [db_enums::TransactionStatus; 2] {
    [
        db_enums::TransactionStatus::Pending,
        db_enums::TransactionStatus::AwaitingPayment,
    ]
}

fn backend(err: DbErr) -> StoreError {
    error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id.into(),
            wallet_address: model.wallet_address,
            email: model.email,
            email_verified: model.email_verified,
            name: model.name,
            kyc_status: model.kyc_status.map(Into::into),
        }
    }
}

impl From<sales::Model> for Sale {
    fn from(model: sales::Model) -> Self {
        Self {
            id: model.id.into(),
            name: model.name,
            token_symbol: model.token_symbol,
            status: model.status.into(),
            initial_token_quantity: model.initial_token_quantity,
            available_token_quantity: model.available_token_quantity,
            minimum_token_buy_per_user: model.minimum_token_buy_per_user,
            maximum_token_buy_per_user: model.maximum_token_buy_per_user,
            token_price_per_unit: model.token_price_per_unit,
            currency: model.currency,
            sale_closing_date: model.sale_closing_date.with_timezone(&Utc),
            requires_kyc: model.requires_kyc,
            saft: model.saft.into(),
            to_wallet_address: model.to_wallet_address,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<transactions::Model> for Transaction {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: model.id.into(),
            user_id: model.user_id.into(),
            sale_id: model.sale_id.into(),
            token_symbol: model.token_symbol,
            quantity: model.quantity,
            form_of_payment: model.form_of_payment.into(),
            paid_currency: model.paid_currency,
            price: model.price,
            total_amount: model.total_amount,
            fees: model.fees,
            status: model.status.into(),
            payment_evidence: model.payment_evidence,
            rejection_reason: model.rejection_reason,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<&Transaction> for transactions::ActiveModel {
    fn from(t: &Transaction) -> Self {
        Self {
            id: Set(t.id.into_inner()),
            user_id: Set(t.user_id.into_inner()),
            sale_id: Set(t.sale_id.into_inner()),
            token_symbol: Set(t.token_symbol.clone()),
            quantity: Set(t.quantity),
            form_of_payment: Set(t.form_of_payment.into()),
            paid_currency: Set(t.paid_currency.clone()),
            price: Set(t.price),
            total_amount: Set(t.total_amount),
            fees: Set(t.fees),
            status: Set(t.status.into()),
            payment_evidence: Set(t.payment_evidence.clone()),
            rejection_reason: Set(t.rejection_reason.clone()),
            comment: Set(t.comment.clone()),
            created_at: Set(t.created_at.into()),
            updated_at: Set(t.updated_at.into()),
        }
    }
}
