//! Purchase quote routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokensale_core::currency::Quote;
use tokensale_core::transaction::FormOfPayment;
use tokensale_shared::types::SaleId;

use crate::{AppState, error::ApiError};

/// Creates the quote routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sales/{sale_id}/quote", post(quote))
}

/// Request body for a quote.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    /// Tokens to buy.
    pub quantity: Decimal,
    /// Currency to pay in.
    pub paid_currency: String,
    /// Form of payment; card payments carry the fee.
    pub form_of_payment: FormOfPayment,
}

/// Response for a quote.
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    /// Sale the quote is for.
    pub sale_id: SaleId,
    /// Tokens priced.
    pub quantity: Decimal,
    /// Form of payment priced.
    pub form_of_payment: FormOfPayment,
    /// Prices in the paid currency.
    #[serde(flatten)]
    pub quote: Quote,
}

/// POST `/sales/{sale_id}/quote` - Price a purchase before submitting it.
///
/// The client sends the returned `amount` back as `total_amount` when it
/// creates the transaction.
async fn quote(
    State(state): State<AppState>,
    Path(sale_id): Path<SaleId>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let quote = state
        .transactions
        .quote(
            sale_id,
            payload.quantity,
            &payload.paid_currency,
            payload.form_of_payment,
        )
        .await?;

    Ok(Json(QuoteResponse {
        sale_id,
        quantity: payload.quantity,
        form_of_payment: payload.form_of_payment,
        quote,
    }))
}
