use thiserror::Error;

use crate::{db_types::PaymentRecord, deriver::AddressDerivationError};

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No payment record exists for order {0}")]
    RecordNotFound(String),
    #[error("Invalid address format. {0}")]
    InvalidAddressFormat(String),
    #[error("Order {order_id} cannot move from {status} via this operation")]
    TransitionForbidden { order_id: String, status: String },
    #[error("Address derivation failed. {0}")]
    DerivationError(#[from] AddressDerivationError),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Result of a guarded state transition. Idempotent operations report whether they changed
/// anything, and hand back the record as it stands either way.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The conditional update matched and the transition was written.
    Applied(PaymentRecord),
    /// The record was already in a terminal state. The stored record, including the original
    /// confirmation details, is returned untouched.
    AlreadySettled(PaymentRecord),
}

impl TransitionOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::AlreadySettled(r) => r,
        }
    }

    pub fn into_record(self) -> PaymentRecord {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::AlreadySettled(r) => r,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}
