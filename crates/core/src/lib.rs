//! Core business logic for the token sale.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence and exchange rates are reached through traits implemented elsewhere.
//!
//! # Modules
//!
//! - `currency` - Precision policy, exchange rates and the amount calculator
//! - `sale` - Token sales
//! - `user` - Buyers
//! - `transaction` - Purchase state machine, validation rules and service
//! - `store` - Persistence seam and the in-memory store
//! - `lifecycle` - Stale transaction and sale closing sweeps

pub mod currency;
pub mod lifecycle;
pub mod sale;
pub mod store;
pub mod transaction;
pub mod user;
