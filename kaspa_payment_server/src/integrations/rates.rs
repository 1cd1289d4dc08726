use std::time::Duration;

use kaspa_api_client::{coingecko, cryptocompare, RateSourceClient};
use kaspa_payment_engine::traits::{RateSource, RateSourceFailure};
use log::warn;

use crate::errors::ServerError;

/// [`RateSource`] implementation backed by one of the REST price source clients.
#[derive(Clone)]
pub struct PriceSource {
    client: RateSourceClient,
}

impl PriceSource {
    pub fn new(client: RateSourceClient) -> Self {
        Self { client }
    }
}

impl RateSource for PriceSource {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn fetch_rate(&self) -> Result<f64, RateSourceFailure> {
        let quote = self.client.fetch().await.map_err(|e| RateSourceFailure::FetchError {
            source_name: self.client.name().to_string(),
            message: e.to_string(),
        })?;
        Ok(quote.rate)
    }
}

/// Build the configured price sources, preserving priority order. Unknown names are skipped with
/// a warning rather than failing startup.
pub fn build_rate_sources(names: &[String], timeout: Duration) -> Result<Vec<PriceSource>, ServerError> {
    let mut sources = Vec::with_capacity(names.len());
    for name in names {
        let def = match name.as_str() {
            "coingecko" => coingecko(),
            "cryptocompare" => cryptocompare(),
            other => {
                warn!("💱️ Unknown rate source '{other}' in KPG_RATE_SOURCES. Skipping it.");
                continue;
            },
        };
        let client = RateSourceClient::new(def, timeout).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        sources.push(PriceSource { client });
    }
    if sources.is_empty() {
        return Err(ServerError::ConfigurationError(
            "No usable rate sources are configured. Check KPG_RATE_SOURCES.".to_string(),
        ));
    }
    Ok(sources)
}
