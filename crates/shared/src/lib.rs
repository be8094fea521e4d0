//! Shared types and configuration for the token sale backend.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision and currency classes
//! - Typed IDs for type-safe entity references
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{
    AppConfig, CleanupConfig, ConfigError, DatabaseConfig, PricingConfig, RatesConfig,
    RoundingMode, ServerConfig,
};
