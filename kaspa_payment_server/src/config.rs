use std::env;

use chrono::Duration;
use kaspa_api_client::KaspaApiConfig;
use kaspa_payment_engine::{db_types::WatchOnlyKey, oracle::DEFAULT_RATE_TTL_SECONDS};
use log::*;

use crate::errors::ServerError;

const DEFAULT_KPG_HOST: &str = "127.0.0.1";
const DEFAULT_KPG_PORT: u16 = 8380;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_ABANDON_AFTER: Duration = Duration::hours(24);
const DEFAULT_RATE_CACHE_TTL: Duration = Duration::seconds(DEFAULT_RATE_TTL_SECONDS);
const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SWEEP_BATCH_SIZE: i64 = 50;
const DEFAULT_SWEEP_BUDGET_SECS: u64 = 25;
const DEFAULT_AMOUNT_TOLERANCE: i64 = 1;
const DEFAULT_RATE_SOURCES: &str = "coingecko,cryptocompare";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The merchant's watch-only extended public key. The one piece of configuration the server
    /// cannot run without.
    pub wallet_kpub: Option<WatchOnlyKey>,
    /// Base URL and timeout for the chain indexer API.
    pub chain_api: KaspaApiConfig,
    /// Price source names, in priority order.
    pub rate_sources: Vec<String>,
    /// Per-request timeout when querying price sources.
    pub rate_timeout: std::time::Duration,
    /// How long a fetched exchange rate is served from cache.
    pub rate_cache_ttl: Duration,
    /// Tick interval of the background sweep worker.
    pub poll_interval: std::time::Duration,
    /// How long an order may wait for payment before being abandoned.
    pub abandon_after: Duration,
    /// Maximum orders examined per sweep.
    pub sweep_batch_size: i64,
    /// Wall-clock budget for one sweep.
    pub sweep_budget: std::time::Duration,
    /// Matching tolerance in sompi.
    pub amount_tolerance: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KPG_HOST.to_string(),
            port: DEFAULT_KPG_PORT,
            database_url: String::default(),
            wallet_kpub: None,
            chain_api: KaspaApiConfig::default(),
            rate_sources: DEFAULT_RATE_SOURCES.split(',').map(String::from).collect(),
            rate_timeout: std::time::Duration::from_secs(DEFAULT_RATE_TIMEOUT_SECS),
            rate_cache_ttl: DEFAULT_RATE_CACHE_TTL,
            poll_interval: std::time::Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            abandon_after: DEFAULT_ABANDON_AFTER,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            sweep_budget: std::time::Duration::from_secs(DEFAULT_SWEEP_BUDGET_SECS),
            amount_tolerance: DEFAULT_AMOUNT_TOLERANCE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KPG_HOST").ok().unwrap_or_else(|| DEFAULT_KPG_HOST.into());
        let port = env::var("KPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for KPG_PORT. {e} Using the default, {DEFAULT_KPG_PORT}, instead."
                    );
                    DEFAULT_KPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KPG_PORT);
        let database_url = env::var("KPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ KPG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let wallet_kpub = match env::var("KPG_WALLET_KPUB") {
            Ok(s) => match WatchOnlyKey::try_new(&s) {
                Ok(key) => Some(key),
                Err(e) => {
                    error!("🪛️ KPG_WALLET_KPUB is not a valid watch-only key. {e}");
                    None
                },
            },
            Err(_) => {
                error!(
                    "🪛️ KPG_WALLET_KPUB is not set. The server cannot derive payment addresses without it and will \
                     refuse to start."
                );
                None
            },
        };
        let chain_api = KaspaApiConfig::new_from_env_or_default();
        let rate_sources = env::var("KPG_RATE_SOURCES")
            .ok()
            .unwrap_or_else(|| {
                info!("🪛️ KPG_RATE_SOURCES is not set. Using the defaults: {DEFAULT_RATE_SOURCES}");
                DEFAULT_RATE_SOURCES.to_string()
            })
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();
        let rate_timeout = std::time::Duration::from_secs(env_u64("KPG_RATE_TIMEOUT", DEFAULT_RATE_TIMEOUT_SECS));
        let rate_cache_ttl =
            Duration::seconds(env_u64("KPG_RATE_CACHE_TTL", DEFAULT_RATE_CACHE_TTL.num_seconds() as u64) as i64);
        let poll_interval = std::time::Duration::from_secs(env_u64("KPG_POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS));
        let abandon_after =
            Duration::hours(env_u64("KPG_ABANDON_AFTER_HOURS", DEFAULT_ABANDON_AFTER.num_hours() as u64) as i64);
        let sweep_batch_size = env_u64("KPG_SWEEP_BATCH_SIZE", DEFAULT_SWEEP_BATCH_SIZE as u64) as i64;
        let sweep_budget = std::time::Duration::from_secs(env_u64("KPG_SWEEP_BUDGET", DEFAULT_SWEEP_BUDGET_SECS));
        let amount_tolerance = env_u64("KPG_AMOUNT_TOLERANCE", DEFAULT_AMOUNT_TOLERANCE as u64) as i64;
        Self {
            host,
            port,
            database_url,
            wallet_kpub,
            chain_api,
            rate_sources,
            rate_timeout,
            rate_cache_ttl,
            poll_interval,
            abandon_after,
            sweep_batch_size,
            sweep_budget,
            amount_tolerance,
        }
    }

    /// The watch-only key, or a configuration error for handlers that cannot proceed without it.
    pub fn require_kpub(&self) -> Result<WatchOnlyKey, ServerError> {
        self.wallet_kpub
            .clone()
            .ok_or_else(|| ServerError::ConfigurationError("KPG_WALLET_KPUB is not configured".to_string()))
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(s) => s.parse::<u64>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {var}: {s}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {var} is not set. Using the default value of {default}.");
            default
        },
    }
}
