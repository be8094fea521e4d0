//! Purchase transaction routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokensale_core::transaction::{
    CreateTransactionData, StatusPayload, Transaction, TransactionError, TransactionStatus,
    ValidationReason,
};
use tokensale_shared::types::TransactionId;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route("/transactions/{transaction_id}", get(get_transaction))
        .route("/transactions/{transaction_id}/status", patch(update_status))
}

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status.
    pub status: TransactionStatus,
    /// Extra fields; `payment_evidence` is required for PAYMENT_SUBMITTED
    /// and `rejection_reason` for REJECTED.
    #[serde(flatten)]
    pub payload: StatusPayload,
}

/// POST `/transactions` - Validate a purchase and reserve its tokens.
async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionData>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let transaction = state.transactions.create_transaction(&payload).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET `/transactions/{transaction_id}` - Fetch one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, ApiError> {
    let mut tx = state.store.begin().await?;
    let transaction = tx
        .find_transaction(transaction_id)
        .await?
        .ok_or(ValidationReason::TransactionNotFound)
        .map_err(TransactionError::from)?;
    Ok(Json(transaction))
}

/// PATCH `/transactions/{transaction_id}/status` - Move a transaction through
/// the status machine.
async fn update_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<TransactionId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = state
        .transactions
        .update_status(transaction_id, request.status, &request.payload)
        .await?;
    info!(
        transaction_id = %transaction.id,
        status = %transaction.status,
        "Transaction status changed via API"
    );
    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tokensale_shared::types::TransactionId;

    use crate::test_support::{TestApp, send};

    fn purchase(app: &TestApp, quantity: &str, fop: &str, currency: &str, total: &str) -> Value {
        json!({
            "user_id": app.user.id,
            "sale_id": app.sale.id,
            "token_symbol": "tkn",
            "quantity": quantity,
            "form_of_payment": fop,
            "paid_currency": currency,
            "total_amount": total,
        })
    }

    #[tokio::test]
    async fn test_create_transaction_reserves_tokens() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/transactions",
            Some(purchase(&app, "100", "CARD", "USD", "51.50")),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "PENDING");
        assert_eq!(body["total_amount"], "51.5000");
        assert_eq!(body["fees"], "1.5000");
        assert_eq!(body["token_symbol"], "TKN");
        assert_eq!(
            app.store.sale(app.sale.id).await.unwrap().available_token_quantity,
            dec!(900)
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_reported() {
        let app = TestApp::new().await;
        let mut request = purchase(&app, "10", "TRANSFER", "USD", "5");
        request.as_object_mut().unwrap().remove("sale_id");

        let (status, body) = send(&app.router, "POST", "/api/v1/transactions", Some(request)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["reason"], "invalid_data");
        assert_eq!(body["field"], "sale_id");
    }

    #[tokio::test]
    async fn test_above_maximum_is_refused() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/transactions",
            Some(purchase(&app, "600", "TRANSFER", "USD", "300")),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["reason"], "above_maximum");
        assert!(app.store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_flow_through_api() {
        let app = TestApp::new().await;
        let (_, created) = send(
            &app.router,
            "POST",
            "/api/v1/transactions",
            Some(purchase(&app, "10", "TRANSFER", "USD", "5")),
        )
        .await;
        let uri = format!("/api/v1/transactions/{}/status", created["id"].as_str().unwrap());

        let (status, _) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "AWAITING_PAYMENT" }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "PAYMENT_SUBMITTED" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["reason"], "evidence_required");

        let (status, body) = send(
            &app.router,
            "PATCH",
            &uri,
            Some(json!({ "status": "PAYMENT_SUBMITTED", "payment_evidence": "wire ref 42" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payment_evidence"], "wire ref 42");

        let (status, body) = send(&app.router, "PATCH", &uri, Some(json!({ "status": "PENDING" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "INVALID_STATUS_TRANSITION");

        let (status, body) = send(
            &app.router,
            "GET",
            &format!("/api/v1/transactions/{}", created["id"].as_str().unwrap()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PAYMENT_SUBMITTED");
    }

    #[tokio::test]
    async fn test_get_unknown_transaction() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            "GET",
            &format!("/api/v1/transactions/{}", TransactionId::new()),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["reason"], "transaction_not_found");
    }
}
