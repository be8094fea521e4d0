//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for quotes, conversions and purchases
//! - Admin routes running the lifecycle sweeps
//! - JSON error responses
//! - The HTTP exchange rate source

pub mod error;
pub mod rates;
pub mod routes;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tokensale_core::currency::AmountCalculator;
use tokensale_core::lifecycle::LifecyclePolicy;
use tokensale_core::store::SaleStore;
use tokensale_core::transaction::TransactionService;

pub use error::ApiError;
pub use rates::HttpRateSource;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence.
    pub store: Arc<dyn SaleStore>,
    /// Amount calculator.
    pub calculator: Arc<AmountCalculator>,
    /// Purchase creation and status updates.
    pub transactions: TransactionService,
    /// Sweep rules.
    pub lifecycle: LifecyclePolicy,
}

impl AppState {
    /// Wires the services on top of a store and a calculator.
    #[must_use]
    pub fn new(
        store: Arc<dyn SaleStore>,
        calculator: Arc<AmountCalculator>,
        lifecycle: LifecyclePolicy,
    ) -> Self {
        let transactions = TransactionService::new(Arc::clone(&store), Arc::clone(&calculator));
        Self {
            store,
            calculator,
            transactions,
            lifecycle,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
