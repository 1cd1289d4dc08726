//! Kaspa Payment Engine
//!
//! The engine accepts Kaspa as a payment method against e-commerce orders using a watch-only
//! extended public key ("kpub"). It never holds spendable keys and never broadcasts transactions;
//! it derives a unique receiving address per order and detects payment arrival by polling a
//! blockchain indexer.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly; use the public API instead. The
//!    exception is the data types, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`PaymentFlowApi`] and friends in [`mod@kpe_api`]). This owns the
//!    order payment lifecycle: address assignment, payment checking, idempotent confirmation and
//!    abandonment. Backends implement the traits in [`mod@traits`].
//! 3. Leaf components with no storage of their own: the [`deriver`](mod@deriver) (watch-only
//!    address derivation), the [`checker`](mod@checker) (timestamp-gated payment matching) and
//!    the [`oracle`](mod@oracle) (cached exchange rates with ordered source fallback).
//!
//! The engine also emits events when payments are confirmed or orders abandoned. A simple actor
//! framework lets the hosting application hook into these, e.g. to notify the order store.
pub mod checker;
pub mod db_types;
pub mod deriver;
pub mod events;
pub mod helpers;
mod kpe_api;
pub mod oracle;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use kpe_api::{
    exchange_objects::ExchangeRate,
    flow_objects::{FlowConfig, OrderCheckResult, PaymentInitiation, SweepResult},
    payment_flow_api::PaymentFlowApi,
};
