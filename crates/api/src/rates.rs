//! Exchange rate source backed by an HTTP endpoint.
//!
//! The endpoint returns the whole table as nested JSON objects keyed by
//! source then target symbol: `{"USD": {"EUR": "0.92", "ETH": "0.0004"}}`.
//! Rates may be JSON strings or numbers; strings keep every digit.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokensale_core::currency::{ExchangeRateTable, RateSource, RateSourceError};
use tokensale_shared::RatesConfig;
use tracing::{debug, warn};

/// Fetches the rate table from a remote provider on every call.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRateSource {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &RatesConfig) -> Result<Self, RateSourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RateSourceError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Provider endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rates(&self) -> Result<ExchangeRateTable, RateSourceError> {
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "Exchange rate request failed");
                RateSourceError(e.to_string())
            })?;

        let raw: HashMap<String, HashMap<String, Decimal>> = response
            .json()
            .await
            .map_err(|e| RateSourceError(format!("Malformed rate table: {e}")))?;

        let table = ExchangeRateTable::from(raw);
        debug!(empty = table.is_empty(), "Exchange rates fetched");
        Ok(table)
    }
}
