//! Router fixtures for route tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;
use tokensale_core::currency::{AmountCalculator, ExchangeRateTable, StaticRateSource};
use tokensale_core::lifecycle::LifecyclePolicy;
use tokensale_core::sale::{SaftRequirement, Sale, SaleStatus};
use tokensale_core::store::MemoryStore;
use tokensale_core::user::User;
use tokensale_shared::PricingConfig;
use tokensale_shared::types::{SaleId, UserId};

use crate::{AppState, create_router};

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub sale: Sale,
    pub user: User,
}

impl TestApp {
    /// One open USD sale of 1000 tokens at 0.5, one verified buyer, 3% card fee.
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let now = Utc::now();
        let sale = Sale {
            id: SaleId::new(),
            name: "Public round".to_string(),
            token_symbol: "TKN".to_string(),
            status: SaleStatus::Open,
            initial_token_quantity: dec!(1000),
            available_token_quantity: dec!(1000),
            minimum_token_buy_per_user: Some(dec!(1)),
            maximum_token_buy_per_user: Some(dec!(500)),
            token_price_per_unit: dec!(0.5),
            currency: "USD".to_string(),
            sale_closing_date: now + Duration::days(14),
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
            name: Some("Buyer".to_string()),
            kyc_status: None,
        };
        store.put_sale(sale.clone()).await;
        store.put_user(user.clone()).await;

        let config = PricingConfig {
            fee_basis_points: dec!(300),
            ..PricingConfig::default()
        };
        let rates = ExchangeRateTable::new()
            .with_rate("USD", "ETH", dec!(0.0004))
            .with_rate("USD", "EUR", dec!(0.92));
        let calculator =
            AmountCalculator::new(&config, Arc::new(StaticRateSource::new(rates))).unwrap();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(calculator),
            LifecyclePolicy::default(),
        );

        Self {
            router: create_router(state),
            store,
            sale,
            user,
        }
    }
}

/// Sends one request and returns the status with the parsed JSON body.
pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
