//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokensale_core::currency::CurrencyError;
use tokensale_core::store::StoreError;
use tokensale_core::transaction::TransactionError;
use tracing::error;

/// Error body returned by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Validation reason code, for refused purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Request field at fault.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: u16, error: &'static str, message: String) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: ErrorBody {
                error,
                message,
                reason: None,
                field: None,
            },
        }
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        let mut api = Self::new(err.status_code(), err.error_code(), err.to_string());
        if let TransactionError::Validation(validation) = &err {
            api.body.reason = Some(validation.reason.code());
            api.body.field = validation.field;
        }
        api
    }
}

impl From<CurrencyError> for ApiError {
    fn from(err: CurrencyError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = self.body;
        if self.status.is_server_error() && self.status != StatusCode::BAD_GATEWAY {
            error!(code = body.error, message = %body.message, "Request failed");
            body.message = "An error occurred".to_string();
        }
        (self.status, Json(body)).into_response()
    }
}
