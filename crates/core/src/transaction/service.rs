//! Transaction service: validation, pricing and persistence in one unit.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokensale_shared::types::{SaleId, TransactionId};
use tracing::{error, info};

use crate::currency::{AmountCalculator, Quote, QuoteInput};
use crate::sale::Sale;
use crate::store::{SaleStore, StoreError};
use crate::transaction::error::{TransactionError, ValidationReason};
use crate::transaction::types::{
    CreateTransactionData, FormOfPayment, StatusPayload, Transaction, TransactionStatus,
};
use crate::transaction::validator::TransactionValidator;

/// Creates and moves transactions, keeping the sale counter in step.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn SaleStore>,
    calculator: Arc<AmountCalculator>,
}

impl TransactionService {
    /// Creates a service over a store and a calculator.
    #[must_use]
    pub fn new(store: Arc<dyn SaleStore>, calculator: Arc<AmountCalculator>) -> Self {
        Self { store, calculator }
    }

    /// Prices `quantity` tokens of `sale` paid in `paid_currency`.
    ///
    /// Card payments carry the configured fee.
    pub async fn quote_for_sale(
        &self,
        sale: &Sale,
        quantity: Decimal,
        paid_currency: &str,
        form_of_payment: FormOfPayment,
    ) -> Result<Quote, TransactionError> {
        let quote = self
            .calculator
            .quote(quote_input(sale, quantity, paid_currency, form_of_payment))
            .await?;
        Ok(quote)
    }

    /// Loads a sale and prices a purchase in it.
    pub async fn quote(
        &self,
        sale_id: SaleId,
        quantity: Decimal,
        paid_currency: &str,
        form_of_payment: FormOfPayment,
    ) -> Result<Quote, TransactionError> {
        let sale = {
            let mut tx = self.store.begin().await?;
            tx.find_sale(sale_id)
                .await?
                .ok_or(ValidationReason::SaleNotFound)?
        };
        self.quote_for_sale(&sale, quantity, paid_currency, form_of_payment)
            .await
    }

    /// Validates a purchase, reserves its tokens and stores it as PENDING.
    ///
    /// The client total must equal the server quote; the stored price,
    /// total and fees are always the server's. The exchange rate is fetched
    /// before the store unit opens, so no lock is held across the rate
    /// source call.
    pub async fn create_transaction(
        &self,
        data: &CreateTransactionData,
    ) -> Result<Transaction, TransactionError> {
        let now = Utc::now();
        let required = TransactionValidator::check_required_fields(data)?;

        let priced_currency = self.sale_currency(required.sale_id).await?;
        // Rate errors surface only after validation, keeping the check order.
        let exchange_rate = match &priced_currency {
            Some(currency) => Some(
                self.calculator
                    .exchange_rate(currency, &required.paid_currency)
                    .await,
            ),
            None => None,
        };

        let mut tx = self.store.begin().await?;

        let validated =
            TransactionValidator::validate_transaction_creation(tx.as_mut(), data, now).await?;
        let input = validated.input;
        let sale = validated.sale;

        let exchange_rate = match (priced_currency, exchange_rate) {
            (Some(currency), Some(rate)) if currency == sale.currency => rate?,
            _ => {
                return Err(StoreError::Conflict(format!(
                    "Sale {} changed while it was being priced",
                    sale.id
                ))
                .into());
            }
        };
        let quote = self.calculator.quote_with_rate(
            &quote_input(&sale, input.quantity, &input.paid_currency, input.form_of_payment),
            exchange_rate,
        )?;
        if quote.amount != input.total_amount {
            return Err(ValidationReason::AmountMismatch.into());
        }

        let transaction = Transaction {
            id: TransactionId::new(),
            user_id: input.user_id,
            sale_id: input.sale_id,
            token_symbol: sale.token_symbol.clone(),
            quantity: input.quantity,
            form_of_payment: input.form_of_payment,
            paid_currency: quote.paid_currency,
            price: quote.price_per_unit,
            total_amount: quote.amount,
            fees: quote.fees,
            status: TransactionStatus::Pending,
            payment_evidence: None,
            rejection_reason: None,
            comment: None,
            created_at: now,
            updated_at: now,
        };

        tx.insert_transaction(&transaction)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => ValidationReason::PendingTransactionExists.into(),
                other => TransactionError::Store(other),
            })?;
        let sale = tx
            .update_sale_quantity(transaction.sale_id, -transaction.quantity)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => ValidationReason::InsufficientTokens.into(),
                other => TransactionError::Store(other),
            })?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            sale_id = %transaction.sale_id,
            quantity = %transaction.quantity,
            total_amount = %transaction.total_amount,
            available = %sale.available_token_quantity,
            "Transaction created"
        );
        Ok(transaction)
    }

    /// Reads a sale's currency in a short unit of its own.
    async fn sale_currency(&self, sale_id: SaleId) -> Result<Option<String>, TransactionError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_sale(sale_id).await?.map(|sale| sale.currency))
    }

    /// Moves a transaction to `new_status`.
    ///
    /// CANCELLED and REJECTED give the reserved tokens back to the sale in
    /// the same unit as the status change.
    pub async fn update_status(
        &self,
        id: TransactionId,
        new_status: TransactionStatus,
        payload: &StatusPayload,
    ) -> Result<Transaction, TransactionError> {
        let mut tx = self.store.begin().await?;

        let current = match TransactionValidator::validate_transaction_status_update(
            tx.as_mut(),
            id,
            new_status,
            payload,
        )
        .await
        {
            Ok(current) => current,
            Err(err @ TransactionError::InvalidStatusTransition { .. }) => {
                error!(transaction_id = %id, error = %err, "Unexpected status transition requested");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let fields = StatusPayload {
            payment_evidence: payload
                .payment_evidence
                .clone()
                .filter(|_| new_status == TransactionStatus::PaymentSubmitted),
            rejection_reason: payload
                .rejection_reason
                .clone()
                .filter(|_| new_status == TransactionStatus::Rejected),
            comment: payload
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| current.comment_with(c)),
        };

        let updated = tx.update_transaction_status(id, new_status, &fields).await?;
        if new_status.releases_tokens() {
            tx.update_sale_quantity(current.sale_id, current.quantity)
                .await?;
        }
        tx.commit().await?;

        info!(
            transaction_id = %id,
            from = %current.status,
            to = %new_status,
            "Transaction status updated"
        );
        Ok(updated)
    }
}

fn quote_input(
    sale: &Sale,
    quantity: Decimal,
    paid_currency: &str,
    form_of_payment: FormOfPayment,
) -> QuoteInput {
    QuoteInput {
        base_price: sale.token_price_per_unit,
        base_currency: sale.currency.clone(),
        quantity,
        paid_currency: paid_currency.to_string(),
        add_fee: form_of_payment.adds_fee(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{ExchangeRateTable, RateSource, RateSourceError, StaticRateSource};
    use async_trait::async_trait;
    use crate::sale::{SaftRequirement, SaleStatus};
    use crate::store::MemoryStore;
    use crate::user::User;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tokensale_shared::types::UserId;
    use tokensale_shared::PricingConfig;

    struct Fixture {
        store: MemoryStore,
        service: TransactionService,
        sale: Sale,
        user: User,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let now = Utc::now();
        let sale = Sale {
            id: SaleId::new(),
            name: "Seed".to_string(),
            token_symbol: "TKN".to_string(),
            status: SaleStatus::Open,
            initial_token_quantity: dec!(100),
            available_token_quantity: dec!(100),
            minimum_token_buy_per_user: Some(dec!(1)),
            maximum_token_buy_per_user: None,
            token_price_per_unit: dec!(0.5),
            currency: "USD".to_string(),
            sale_closing_date: now + Duration::days(10),
            requires_kyc: false,
            saft: SaftRequirement::NotRequired,
            to_wallet_address: Some("0xsale".to_string()),
            created_at: now,
            updated_at: now,
        };
        let user = User {
            id: UserId::new(),
            wallet_address: "0xbuyer".to_string(),
            email: Some("buyer@example.com".to_string()),
            email_verified: true,
            name: None,
            kyc_status: None,
        };
        store.put_sale(sale.clone()).await;
        store.put_user(user.clone()).await;

        let config = PricingConfig {
            fee_basis_points: dec!(300),
            ..PricingConfig::default()
        };
        let rates = ExchangeRateTable::new().with_rate("USD", "ETH", dec!(0.0004));
        let calculator =
            AmountCalculator::new(&config, Arc::new(StaticRateSource::new(rates))).unwrap();
        let service = TransactionService::new(Arc::new(store.clone()), Arc::new(calculator));

        Fixture {
            store,
            service,
            sale,
            user,
        }
    }

    fn request(f: &Fixture, quantity: Decimal, fop: FormOfPayment, currency: &str, total: Decimal) -> CreateTransactionData {
        CreateTransactionData {
            user_id: Some(f.user.id),
            sale_id: Some(f.sale.id),
            token_symbol: Some("TKN".to_string()),
            quantity: Some(quantity),
            form_of_payment: Some(fop),
            total_amount: Some(total),
            paid_currency: Some(currency.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_reserves_tokens() {
        let f = fixture().await;
        let created = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5)))
            .await
            .unwrap();

        assert_eq!(created.status, TransactionStatus::Pending);
        assert_eq!(created.total_amount.to_string(), "5.0000");
        assert_eq!(created.price.to_string(), "0.5000");
        assert_eq!(created.fees.to_string(), "0.0000");
        assert_eq!(
            f.store.sale(f.sale.id).await.unwrap().available_token_quantity,
            dec!(90)
        );
        assert_eq!(f.store.transaction(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_card_includes_fee() {
        let f = fixture().await;
        // 10 * 0.5 = 5.0000, fee 3% = 0.1500
        let created = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Card, "USD", dec!(5.15)))
            .await
            .unwrap();
        assert_eq!(created.fees.to_string(), "0.1500");
        assert_eq!(created.total_amount.to_string(), "5.1500");
    }

    #[tokio::test]
    async fn test_create_crypto_uses_crypto_precision() {
        let f = fixture().await;
        // 0.5 USD * 0.0004 = 0.0002 ETH per token
        let created = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Crypto, "eth", dec!(0.002)))
            .await
            .unwrap();
        assert_eq!(created.paid_currency, "ETH");
        assert_eq!(created.price.to_string(), "0.00020000");
        assert_eq!(created.total_amount.to_string(), "0.00200000");
    }

    #[tokio::test]
    async fn test_amount_mismatch_rolls_back() {
        let f = fixture().await;
        let err = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(4.99)))
            .await
            .unwrap_err();

        assert_eq!(err.reason(), Some(ValidationReason::AmountMismatch));
        assert_eq!(
            f.store.sale(f.sale.id).await.unwrap().available_token_quantity,
            dec!(100)
        );
        assert!(f.store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_purchase_blocked_while_first_in_flight() {
        let f = fixture().await;
        let data = request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5));
        f.service.create_transaction(&data).await.unwrap();

        let err = f.service.create_transaction(&data).await.unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::PendingTransactionExists));
        assert_eq!(
            f.store.sale(f.sale.id).await.unwrap().available_token_quantity,
            dec!(90)
        );
    }

    #[tokio::test]
    async fn test_concurrent_purchases_never_oversell() {
        let f = fixture().await;
        let mut handles = Vec::new();
        for _ in 0..5 {
            let buyer = User {
                id: UserId::new(),
                ..f.user.clone()
            };
            f.store.put_user(buyer.clone()).await;
            let data = CreateTransactionData {
                user_id: Some(buyer.id),
                ..request(&f, dec!(30), FormOfPayment::Transfer, "USD", dec!(15))
            };
            let service = f.service.clone();
            handles.push(tokio::spawn(async move { service.create_transaction(&data).await }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert_eq!(err.reason(), Some(ValidationReason::InsufficientTokens)),
            }
        }
        assert_eq!(created, 3);
        assert_eq!(
            f.store.sale(f.sale.id).await.unwrap().available_token_quantity,
            dec!(10)
        );
    }

    #[tokio::test]
    async fn test_full_happy_path() {
        let f = fixture().await;
        let created = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5)))
            .await
            .unwrap();

        let steps = [
            (TransactionStatus::AwaitingPayment, StatusPayload::default()),
            (
                TransactionStatus::PaymentSubmitted,
                StatusPayload {
                    payment_evidence: Some("wire-123".to_string()),
                    ..StatusPayload::default()
                },
            ),
            (TransactionStatus::PaymentVerified, StatusPayload::default()),
            (
                TransactionStatus::Completed,
                StatusPayload {
                    comment: Some("tokens sent".to_string()),
                    ..StatusPayload::default()
                },
            ),
        ];
        for (status, payload) in steps {
            f.service.update_status(created.id, status, &payload).await.unwrap();
        }

        let done = f.store.transaction(created.id).await.unwrap();
        assert_eq!(done.status, TransactionStatus::Completed);
        assert_eq!(done.payment_evidence.as_deref(), Some("wire-123"));
        assert_eq!(done.comment.as_deref(), Some("tokens sent"));
        assert_eq!(
            f.store.sale(f.sale.id).await.unwrap().available_token_quantity,
            dec!(90)
        );
    }

    #[tokio::test]
    async fn test_reject_restores_quantity() {
        let f = fixture().await;
        let created = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5)))
            .await
            .unwrap();

        let rejected = f
            .service
            .update_status(
                created.id,
                TransactionStatus::Rejected,
                &StatusPayload {
                    rejection_reason: Some("payment bounced".to_string()),
                    ..StatusPayload::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(rejected.status, TransactionStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("payment bounced"));
        assert_eq!(
            f.store.sale(f.sale.id).await.unwrap().available_token_quantity,
            dec!(100)
        );
    }

    #[tokio::test]
    async fn test_invalid_transition_changes_nothing() {
        let f = fixture().await;
        let created = f
            .service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5)))
            .await
            .unwrap();

        let err = f
            .service
            .update_status(created.id, TransactionStatus::Completed, &StatusPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransactionError::InvalidStatusTransition { .. }));
        assert_eq!(
            f.store.transaction(created.id).await.unwrap().status,
            TransactionStatus::Pending
        );
    }

    /// Rate source that, while fetching, checks whether the store is free.
    struct StoreCheckingSource {
        store: MemoryStore,
        rates: ExchangeRateTable,
        store_free: std::sync::Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl RateSource for StoreCheckingSource {
        async fn fetch_rates(&self) -> Result<ExchangeRateTable, RateSourceError> {
            let free = tokio::time::timeout(
                std::time::Duration::from_millis(200),
                self.store.transactions(),
            )
            .await
            .is_ok();
            self.store_free.lock().unwrap().push(free);
            Ok(self.rates.clone())
        }
    }

    #[tokio::test]
    async fn test_rate_fetch_runs_outside_the_store_unit() {
        let f = fixture().await;
        let source = Arc::new(StoreCheckingSource {
            store: f.store.clone(),
            rates: ExchangeRateTable::new().with_rate("USD", "ETH", dec!(0.0004)),
            store_free: std::sync::Mutex::default(),
        });
        let calculator = AmountCalculator::new(&PricingConfig::default(), source.clone()).unwrap();
        let service = TransactionService::new(Arc::new(f.store.clone()), Arc::new(calculator));

        let created = service
            .create_transaction(&request(&f, dec!(10), FormOfPayment::Crypto, "ETH", dec!(0.002)))
            .await
            .unwrap();

        assert_eq!(created.total_amount.to_string(), "0.00200000");
        assert_eq!(*source.store_free.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn test_token_symbol_must_match_sale() {
        let f = fixture().await;
        let data = CreateTransactionData {
            token_symbol: Some("BOGUS".to_string()),
            ..request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5))
        };

        let err = f.service.create_transaction(&data).await.unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Validation(ref e)
                if e.reason == ValidationReason::InvalidData && e.field == Some("token_symbol")
        ));
        assert!(f.store.transactions().await.is_empty());

        let lower = CreateTransactionData {
            token_symbol: Some("tkn".to_string()),
            ..request(&f, dec!(10), FormOfPayment::Transfer, "USD", dec!(5))
        };
        let created = f.service.create_transaction(&lower).await.unwrap();
        assert_eq!(created.token_symbol, f.sale.token_symbol);
    }

    #[tokio::test]
    async fn test_quote_unknown_sale() {
        let f = fixture().await;
        let err = f
            .service
            .quote(SaleId::new(), dec!(1), "USD", FormOfPayment::Card)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::SaleNotFound));
    }
}
