//! # Kaspa payment gateway server
//!
//! The REST surface of the gateway. It is responsible for:
//! * accepting payment initiations from the storefront and handing back per-order receiving
//!   addresses,
//! * on-demand payment checks when a customer reports they have paid,
//! * manual confirmation by administrators,
//! * running the background sweep worker that polls the chain for every waiting order.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `GET /health`: liveness check, returns 200 OK.
//! * `POST /api/payments/{order_id}/initiate`: create the payment record and assign an address.
//! * `POST /api/payments/{order_id}/check`: check the chain for this order's payment right now.
//! * `POST /api/payments/{order_id}/confirm`: manual confirmation on admin authority.
//! * `GET /api/payments/{order_id}`: back-office view of the full payment record.
//! * `GET /api/rate`: the current (possibly cached) exchange rate.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod sweep_worker;

use kaspa_payment_engine::{deriver::KpubAddressDeriver, oracle::RateOracle, PaymentFlowApi, SqliteDatabase};

use crate::integrations::{ChainClient, PriceSource};

/// The concrete payment flow API the server wires together.
pub type GatewayApi = PaymentFlowApi<SqliteDatabase, KpubAddressDeriver, ChainClient>;
/// The concrete rate oracle the server wires together.
pub type GatewayOracle = RateOracle<PriceSource>;

#[cfg(test)]
mod endpoint_tests;
