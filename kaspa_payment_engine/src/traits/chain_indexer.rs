use chrono::{DateTime, Utc};
use kpg_common::Sompi;
use thiserror::Error;

use crate::db_types::KaspaAddress;

#[derive(Debug, Clone, Error)]
pub enum ChainIndexerError {
    #[error("Chain indexer request failed: {0}")]
    ApiError(String),
}

/// One output of an on-chain transaction, as reported by the indexer.
#[derive(Debug, Clone)]
pub struct ChainTxOutput {
    pub address: String,
    pub amount: Sompi,
}

/// An accepted-or-not transaction touching a watched address. `observed_at` may be missing for
/// transactions the indexer has not timestamped yet; those never satisfy a timestamp gate.
#[derive(Debug, Clone)]
pub struct ChainTransaction {
    pub txid: String,
    pub observed_at: Option<DateTime<Utc>>,
    pub accepted: bool,
    pub outputs: Vec<ChainTxOutput>,
}

impl ChainTransaction {
    /// Sum of the outputs paying the given address within this transaction.
    pub fn amount_to(&self, address: &KaspaAddress) -> Sompi {
        self.outputs.iter().filter(|o| o.address == address.as_str()).map(|o| o.amount).sum()
    }
}

/// Read-only view of the blockchain via an indexer. All failure modes surface as
/// [`ChainIndexerError::ApiError`]; an indexer outage is indistinguishable from, and must be
/// treated the same as, a slow network. Callers must never confirm or abandon on the back of one.
#[allow(async_fn_in_trait)]
pub trait ChainIndexer: Clone {
    /// Current confirmed balance of the address.
    async fn balance_of(&self, address: &KaspaAddress) -> Result<Sompi, ChainIndexerError>;

    /// Full transaction history for the address, order unspecified.
    async fn transactions_for(&self, address: &KaspaAddress) -> Result<Vec<ChainTransaction>, ChainIndexerError>;
}
