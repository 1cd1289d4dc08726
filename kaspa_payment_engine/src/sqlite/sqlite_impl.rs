//! `SqliteDatabase` is a concrete implementation of the payment engine's storage backend.
//!
//! Unsurprisingly, it uses SQLite. Every guarded transition the [`PaymentGatewayDatabase`] trait
//! promises is realized as a single conditional statement in the [`db`](super::db) module, so
//! SQLite's own write serialization provides the atomicity.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, indexes, new_pool, payments};
use crate::{
    db_types::{KaspaAddress, NewPaymentRecord, OrderId, PaymentConfirmation, PaymentRecord},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, TransitionOutcome},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_payment_record(
        &self,
        record: &NewPaymentRecord,
    ) -> Result<(PaymentRecord, bool), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let (record, inserted) = payments::idempotent_insert(record, &mut conn).await?;
        if inserted {
            debug!("🗃️ Payment record for order {} saved with id {}", record.order_id, record.id);
        }
        Ok((record, inserted))
    }

    async fn fetch_payment_record(&self, order_id: &OrderId) -> Result<PaymentRecord, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_by_order_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| PaymentGatewayError::RecordNotFound(order_id.as_str().to_string()))
    }

    async fn next_derivation_index(&self, account: &str) -> Result<i64, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let index = indexes::next_index(account, &mut conn).await?;
        trace!("🗃️ Allocated derivation index {index}");
        Ok(index)
    }

    async fn record_index_used(&self, account: &str, index: i64) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        indexes::record_used(account, index, &mut conn).await
    }

    async fn attach_address(
        &self,
        order_id: &OrderId,
        address: &KaspaAddress,
        index: i64,
    ) -> Result<Option<PaymentRecord>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::attach_address(order_id, address, index, &mut conn).await?;
        if record.is_some() {
            debug!("🗃️ Order {order_id} now has address {address} at index {index}");
        }
        Ok(record)
    }

    async fn confirm_payment(
        &self,
        order_id: &OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<TransitionOutcome, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let outcome = payments::confirm(order_id, confirmation, &mut conn).await?;
        if outcome.was_applied() {
            debug!("🗃️ Order {order_id} settled as {} via {}", outcome.record().status, confirmation.txid);
        }
        Ok(outcome)
    }

    async fn mark_abandoned(&self, order_id: &OrderId) -> Result<TransitionOutcome, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let outcome = payments::mark_abandoned(order_id, &mut conn).await?;
        if outcome.was_applied() {
            debug!("🗃️ Order {order_id} marked abandoned");
        }
        Ok(outcome)
    }

    async fn fetch_awaiting_payment(&self, limit: i64) -> Result<Vec<PaymentRecord>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_awaiting_payment(limit, &mut conn).await
    }

    async fn close(&self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
