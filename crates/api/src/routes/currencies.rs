//! Currency listing routes.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tokensale_shared::types::CurrencyClass;

use crate::AppState;

/// Creates the currency routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/currencies", get(list_currencies))
}

/// Response for a currency.
#[derive(Debug, Serialize)]
pub struct CurrencyResponse {
    /// Currency symbol.
    pub symbol: String,
    /// FIAT or CRYPTO.
    pub class: CurrencyClass,
    /// Number of decimal places used for amounts in this currency.
    pub precision: u32,
}

/// Response listing every known currency.
#[derive(Debug, Serialize)]
pub struct CurrenciesResponse {
    /// Known currencies, FIAT first.
    pub currencies: Vec<CurrencyResponse>,
    /// Card fee in basis points.
    pub fee_basis_points: String,
}

/// GET `/currencies` - List supported currencies and their precision.
async fn list_currencies(State(state): State<AppState>) -> Json<CurrenciesResponse> {
    let registry = state.calculator.registry();
    let currencies = [CurrencyClass::Fiat, CurrencyClass::Crypto]
        .into_iter()
        .flat_map(|class| {
            let precision = registry.precision_for_class(class);
            registry
                .symbols(class)
                .into_iter()
                .map(move |symbol| CurrencyResponse {
                    symbol: symbol.to_string(),
                    class,
                    precision,
                })
        })
        .collect();

    Json(CurrenciesResponse {
        currencies,
        fee_basis_points: state.calculator.fee_basis_points().to_string(),
    })
}
