//! Database layer with `SeaORM` entities and the PostgreSQL sale store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`SeaOrmStore`], the database implementation of the core store seam
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{SeaOrmStore, SeaOrmTransaction};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tokensale_shared::config::DatabaseConfig;
use tracing::info;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Opens a connection pool sized from the database configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(db)
}
