//! Currency conversion routes.

use axum::{Json, Router, extract::State, routing::post};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokensale_core::currency::ConvertInput;
use tokensale_shared::types::Money;

use crate::{AppState, error::ApiError};

/// Creates the conversion routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/conversions", post(convert))
}

/// Request body for a conversion.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Amount in the source currency.
    pub amount: Decimal,
    /// Source currency symbol.
    pub from: String,
    /// Target currency symbol.
    pub to: String,
    /// Decimal places of the result; defaults to the target's precision.
    pub precision: Option<u32>,
}

/// Response for a conversion.
#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    /// Converted amount.
    pub converted: Money,
    /// Rate applied, rounded to the result precision.
    pub price_per_unit: String,
    /// Raw rate from the table.
    pub exchange_rate: String,
}

/// POST `/conversions` - Convert an amount with the current rate table.
async fn convert(
    State(state): State<AppState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<ConversionResponse>, ApiError> {
    let conversion = state
        .calculator
        .convert_currency(ConvertInput {
            amount: payload.amount,
            from_currency: payload.from,
            to_currency: payload.to,
            precision: payload.precision,
        })
        .await?;

    Ok(Json(ConversionResponse {
        converted: Money::new(conversion.amount, &conversion.currency),
        price_per_unit: conversion.price_per_unit.to_string(),
        exchange_rate: conversion.exchange_rate.to_string(),
    }))
}
