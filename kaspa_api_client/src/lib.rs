//! HTTP clients for the outbound side of the Kaspa payment gateway.
//!
//! Two concerns live here:
//! 1. [`KaspaApi`] — a thin client for a Kaspa blockchain indexer's REST API. The gateway only
//!    ever reads from the chain (address balances and transaction histories); it never holds keys
//!    and never broadcasts.
//! 2. [`RateSourceClient`] — fetches the current KAS price from an ordered list of public price
//!    APIs ([`coingecko`] first, then [`cryptocompare`] by default). Each source is independently
//!    swappable.
mod api;
mod config;
mod error;
mod rates;

mod data_objects;

pub use api::KaspaApi;
pub use config::KaspaApiConfig;
pub use data_objects::{AddressBalance, TransactionDetail, TransactionOutput, TransactionPage};
pub use error::{KaspaApiError, RateSourceError};
pub use rates::{coingecko, cryptocompare, RateQuote, RateSourceClient, RateSourceDef};
