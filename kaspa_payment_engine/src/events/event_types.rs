use serde::Serialize;

use crate::db_types::PaymentRecord;

/// Emitted once per order, after the confirmation transition has been committed. Carries the
/// settled record, including the txid and confirmed amount.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfirmedEvent {
    pub record: PaymentRecord,
}

impl PaymentConfirmedEvent {
    pub fn new(record: PaymentRecord) -> Self {
        Self { record }
    }
}

/// Emitted when an order passes the abandonment ceiling without payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentAbandonedEvent {
    pub record: PaymentRecord,
}

impl PaymentAbandonedEvent {
    pub fn new(record: PaymentRecord) -> Self {
        Self { record }
    }
}
