//! Token sale API server
//!
//! Main entry point for the token sale backend service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokensale_api::{AppState, HttpRateSource, create_router};
use tokensale_core::currency::AmountCalculator;
use tokensale_core::lifecycle::LifecyclePolicy;
use tokensale_core::store::SaleStore;
use tokensale_db::{SeaOrmStore, connect_with};
use tokensale_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokensale=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");
    let store: Arc<dyn SaleStore> = Arc::new(SeaOrmStore::new(db));

    // Pricing
    let rates = HttpRateSource::new(&config.rates)?;
    info!(url = %rates.url(), "Exchange rate provider configured");
    let calculator = Arc::new(AmountCalculator::new(&config.pricing, Arc::new(rates))?);

    let lifecycle = LifecyclePolicy::from_config(&config.cleanup);
    if config.cleanup.enabled {
        spawn_sweeps(Arc::clone(&store), lifecycle, config.cleanup.interval_secs);
    } else {
        warn!("Lifecycle sweeps disabled");
    }

    let state = AppState::new(store, calculator, lifecycle);
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Runs both sweeps every `interval_secs` until the process exits.
fn spawn_sweeps(store: Arc<dyn SaleStore>, policy: LifecyclePolicy, interval_secs: u64) {
    info!(
        interval_secs,
        max_age_hours = policy.max_age_hours(),
        "Lifecycle sweeps scheduled"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let now = Utc::now();
            if let Err(e) = policy.cancel_stale_transactions(store.as_ref(), now).await {
                warn!(error = %e, "Stale transaction sweep aborted");
            }
            if let Err(e) = policy.close_sales(store.as_ref(), now).await {
                warn!(error = %e, "Sale closing sweep aborted");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
