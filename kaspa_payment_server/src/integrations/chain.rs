use kaspa_api_client::{KaspaApi, KaspaApiConfig, KaspaApiError, TransactionDetail};
use kaspa_payment_engine::{
    db_types::KaspaAddress,
    traits::{ChainIndexer, ChainIndexerError, ChainTransaction, ChainTxOutput},
};
use kpg_common::Sompi;

use crate::errors::ServerError;

/// [`ChainIndexer`] implementation backed by the REST indexer client.
#[derive(Clone)]
pub struct ChainClient {
    api: KaspaApi,
}

impl ChainClient {
    pub fn new(config: KaspaApiConfig) -> Result<Self, ServerError> {
        let api = KaspaApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }
}

fn to_chain_transaction(tx: TransactionDetail) -> ChainTransaction {
    let observed_at = tx.observed_at();
    ChainTransaction {
        txid: tx.transaction_id,
        observed_at,
        // Some indexer deployments omit the acceptance flag; only an explicit false disqualifies.
        accepted: tx.is_accepted.unwrap_or(true),
        outputs: tx
            .outputs
            .into_iter()
            .map(|o| ChainTxOutput { address: o.script_public_key_address, amount: o.amount })
            .collect(),
    }
}

fn to_indexer_error(e: KaspaApiError) -> ChainIndexerError {
    ChainIndexerError::ApiError(e.to_string())
}

impl ChainIndexer for ChainClient {
    async fn balance_of(&self, address: &KaspaAddress) -> Result<Sompi, ChainIndexerError> {
        let balance = self.api.address_balance(address.as_str()).await.map_err(to_indexer_error)?;
        Ok(balance.balance)
    }

    async fn transactions_for(&self, address: &KaspaAddress) -> Result<Vec<ChainTransaction>, ChainIndexerError> {
        let txs = self.api.address_transactions(address.as_str()).await.map_err(to_indexer_error)?;
        Ok(txs.into_iter().map(to_chain_transaction).collect())
    }
}
