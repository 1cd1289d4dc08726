//! The traits that define the interfaces of the payment engine's pluggable backends.
//!
//! * [`PaymentGatewayDatabase`] is the persistence seam. The engine ships a SQLite implementation
//!   but the payment flow API is generic over it.
//! * [`ChainIndexer`] abstracts the blockchain indexer the checker polls. Production wires the
//!   REST client in; tests use scripted fakes.
//! * [`RateSource`] abstracts one upstream price API for the rate oracle.

mod chain_indexer;
mod data_objects;
mod payment_gateway_database;
mod rate_source;

pub use chain_indexer::{ChainIndexer, ChainIndexerError, ChainTransaction, ChainTxOutput};
pub use data_objects::{PaymentGatewayError, TransitionOutcome};
pub use payment_gateway_database::PaymentGatewayDatabase;
pub use rate_source::{RateSource, RateSourceFailure};
