//! Persistence errors.

use thiserror::Error;

/// Errors reported by a [`SaleStore`](super::SaleStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row to update does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Write would break a storage constraint (one in-flight purchase per
    /// user and sale, non-negative available quantity).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Backend(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Backend(_) => "DATABASE_ERROR",
        }
    }
}
