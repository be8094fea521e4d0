//! Purchase transactions.
//!
//! # Modules
//!
//! - `types` - Status state machine, form of payment, transaction records
//! - `error` - Validation reasons and transaction errors
//! - `validator` - Creation, status update, closing and timeout rules
//! - `service` - Creation and status updates inside one store unit

pub mod error;
pub mod service;
pub mod types;
pub mod validator;

#[cfg(test)]
mod types_props;

pub use error::{TransactionError, TransactionValidationError, ValidationReason};
pub use service::TransactionService;
pub use types::{
    CreateTransactionData, CreateTransactionInput, FormOfPayment, StatusPayload, Transaction,
    TransactionStatus,
};
pub use validator::{
    ClosingDecision, ClosingReason, TimeoutDecision, TimeoutReason, TransactionValidator,
    ValidatedCreation, DEFAULT_TIMEOUT_HOURS,
};
