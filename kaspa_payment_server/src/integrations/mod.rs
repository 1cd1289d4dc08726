//! Adapters binding the REST clients in `kaspa_api_client` to the engine's backend traits.
mod chain;
mod rates;

pub use chain::ChainClient;
pub use rates::{build_rate_sources, PriceSource};
