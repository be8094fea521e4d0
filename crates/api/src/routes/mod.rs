//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod admin;
pub mod conversions;
pub mod currencies;
pub mod health;
pub mod quotes;
pub mod transactions;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(currencies::routes())
        .merge(conversions::routes())
        .merge(quotes::routes())
        .merge(transactions::routes())
        .merge(admin::routes())
}
