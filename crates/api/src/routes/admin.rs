//! Lifecycle sweep routes.
//!
//! The server runs the same sweeps on a timer; these routes trigger them on
//! demand.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::Serialize;
use tokensale_core::lifecycle::SweepReport;
use tokensale_shared::types::{SaleId, TransactionId};

use crate::{AppState, error::ApiError};

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/cleanup", post(run_cleanup))
        .route("/admin/sales/close", post(run_sale_closing))
}

/// Response for a stale transaction sweep.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    /// Age threshold applied, in hours.
    pub max_age_hours: u32,
    /// Sweep outcome.
    #[serde(flatten)]
    pub report: SweepReport<TransactionId>,
}

/// POST `/admin/cleanup` - Cancel stale transactions now.
async fn run_cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>, ApiError> {
    let report = state
        .lifecycle
        .cancel_stale_transactions(state.store.as_ref(), Utc::now())
        .await?;
    Ok(Json(CleanupResponse {
        max_age_hours: state.lifecycle.max_age_hours(),
        report,
    }))
}

/// POST `/admin/sales/close` - Close expired and sold-out sales now.
async fn run_sale_closing(
    State(state): State<AppState>,
) -> Result<Json<SweepReport<SaleId>>, ApiError> {
    let report = state
        .lifecycle
        .close_sales(state.store.as_ref(), Utc::now())
        .await?;
    Ok(Json(report))
}
