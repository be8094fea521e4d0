//! Token sales.

pub mod types;

pub use types::{SaftRequirement, Sale, SaleStatus};
