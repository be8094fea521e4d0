//! Health check endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the store accepts a unit of work, `degraded` otherwise.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// GET `/health` - Reports whether the store is reachable.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.store.begin().await {
        Ok(_) => (StatusCode::OK, "healthy"),
        Err(e) => {
            warn!(error = %e, "Health check could not reach the store");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
