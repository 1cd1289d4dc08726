use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use reqwest::Client;
use serde_json::Value;

use crate::RateSourceError;

pub const DEFAULT_RATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Definition of one upstream price API: a name, a URL, and a parser that digs the fiat-per-KAS
/// rate out of the response body. Sources are tried in configured priority order and each one is
/// independently swappable.
#[derive(Clone)]
pub struct RateSourceDef {
    pub name: &'static str,
    pub url: String,
    pub parse: fn(&Value) -> Option<f64>,
}

/// CoinGecko simple-price endpoint. Primary source; the 5-minute cache upstream of this client
/// keeps usage within the free tier.
pub fn coingecko() -> RateSourceDef {
    RateSourceDef {
        name: "coingecko",
        url: "https://api.coingecko.com/api/v3/simple/price?ids=kaspa&vs_currencies=usd".to_string(),
        parse: |body| body["kaspa"]["usd"].as_f64(),
    }
}

/// CryptoCompare price endpoint. No API key required. Fallback source.
pub fn cryptocompare() -> RateSourceDef {
    RateSourceDef {
        name: "cryptocompare",
        url: "https://min-api.cryptocompare.com/data/price?fsym=KAS&tsyms=USD".to_string(),
        parse: |body| body["USD"].as_f64(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateQuote {
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
}

/// A single price source bound to an HTTP client with a per-request timeout.
#[derive(Clone)]
pub struct RateSourceClient {
    def: RateSourceDef,
    client: Arc<Client>,
}

impl RateSourceClient {
    pub fn new(def: RateSourceDef, timeout: Duration) -> Result<Self, RateSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateSourceError::Initialization(e.to_string()))?;
        Ok(Self { def, client: Arc::new(client) })
    }

    pub fn name(&self) -> &str {
        self.def.name
    }

    pub async fn fetch(&self) -> Result<RateQuote, RateSourceError> {
        let source_name = self.def.name.to_string();
        trace!("💱️ Querying rate source {source_name}: {}", self.def.url);
        let response = self
            .client
            .get(&self.def.url)
            .send()
            .await
            .map_err(|e| RateSourceError::RequestError { source_name: source_name.clone(), message: e.to_string() })?;
        if !response.status().is_success() {
            return Err(RateSourceError::StatusError { source_name, status: response.status().as_u16() });
        }
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| RateSourceError::ParseError { source_name: source_name.clone(), message: e.to_string() })?;
        let rate = (self.def.parse)(&body).ok_or_else(|| RateSourceError::ParseError {
            source_name: source_name.clone(),
            message: "rate field missing from response".to_string(),
        })?;
        if rate <= 0.0 {
            return Err(RateSourceError::ParseError { source_name, message: format!("non-positive rate {rate}") });
        }
        debug!("💱️ {} quoted {rate}", self.def.name);
        Ok(RateQuote { rate, fetched_at: Utc::now() })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtin_parsers() {
        let cg = coingecko();
        let body: Value = serde_json::from_str(r#"{"kaspa": {"usd": 0.1234}}"#).unwrap();
        assert_eq!((cg.parse)(&body), Some(0.1234));
        assert_eq!((cg.parse)(&Value::Null), None);

        let cc = cryptocompare();
        let body: Value = serde_json::from_str(r#"{"USD": 123.45}"#).unwrap();
        assert_eq!((cc.parse)(&body), Some(123.45));
        assert_eq!((cc.parse)(&serde_json::json!({"EUR": 1.0})), None);
    }
}
