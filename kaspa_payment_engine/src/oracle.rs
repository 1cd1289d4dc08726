//! Cached exchange rate lookups with ordered source fallback.
//!
//! The oracle holds a prioritized list of [`RateSource`]s and a single cached
//! [`ExchangeRate`]. A lookup serves the cache while it is younger than the TTL; otherwise the
//! sources are tried in order and the first success refreshes the cache. Only when every source
//! fails does the lookup error, and in that case checkout must halt rather than fall back to a
//! stale or made-up rate.

use std::sync::Arc;

use chrono::Duration;
use log::*;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{kpe_api::exchange_objects::ExchangeRate, traits::RateSource};

pub const DEFAULT_RATE_TTL_SECONDS: i64 = 300;

#[derive(Debug, Clone, Error)]
pub enum RateOracleError {
    #[error("No exchange rate available: all {0} rate sources failed")]
    RateUnavailable(usize),
}

#[derive(Clone)]
pub struct RateOracle<S: RateSource> {
    sources: Arc<Vec<S>>,
    ttl: Duration,
    currency: String,
    cache: Arc<RwLock<Option<ExchangeRate>>>,
}

impl<S: RateSource> RateOracle<S> {
    pub fn new(sources: Vec<S>, ttl: Duration, currency: String) -> Self {
        Self { sources: Arc::new(sources), ttl, currency, cache: Arc::new(RwLock::new(None)) }
    }

    /// The current exchange rate, from cache if fresh enough, otherwise from the first source
    /// that answers.
    pub async fn get_rate(&self) -> Result<ExchangeRate, RateOracleError> {
        {
            let cache = self.cache.read().await;
            if let Some(rate) = cache.as_ref() {
                if rate.is_fresh(self.ttl) {
                    trace!("💱️ Serving cached rate: {rate}");
                    return Ok(rate.clone());
                }
            }
        }
        self.refresh().await
    }

    /// Query the sources in priority order, cache and return the first success.
    async fn refresh(&self) -> Result<ExchangeRate, RateOracleError> {
        for source in self.sources.iter() {
            match source.fetch_rate().await {
                Ok(rate) => {
                    let rate = ExchangeRate::new(self.currency.clone(), rate, None);
                    info!("💱️ Refreshed exchange rate from {}: {rate}", source.name());
                    let mut cache = self.cache.write().await;
                    *cache = Some(rate.clone());
                    return Ok(rate);
                },
                Err(e) => {
                    warn!("💱️ Rate source {} failed, trying next. {e}", source.name());
                },
            }
        }
        error!("💱️ All {} rate sources failed. No exchange rate is available.", self.sources.len());
        Err(RateOracleError::RateUnavailable(self.sources.len()))
    }
}
