use std::time::Duration;

use log::*;

pub const DEFAULT_KASPA_API_URL: &str = "https://api.kaspa.org";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct KaspaApiConfig {
    /// Base URL of the Kaspa REST indexer, e.g. "https://api.kaspa.org"
    pub base_url: String,
    /// Timeout applied to every request. A timed-out call surfaces as an API error, never as
    /// "payment not found".
    pub timeout: Duration,
}

impl Default for KaspaApiConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_KASPA_API_URL.to_string(), timeout: DEFAULT_API_TIMEOUT }
    }
}

impl KaspaApiConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("KPG_CHAIN_API_URL").unwrap_or_else(|_| {
            info!("KPG_CHAIN_API_URL not set, using {DEFAULT_KASPA_API_URL}");
            DEFAULT_KASPA_API_URL.to_string()
        });
        let timeout = std::env::var("KPG_CHAIN_API_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid KPG_CHAIN_API_TIMEOUT ({s}): {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_API_TIMEOUT);
        Self { base_url, timeout }
    }
}
