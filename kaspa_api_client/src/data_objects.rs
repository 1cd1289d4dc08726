use chrono::{DateTime, TimeZone, Utc};
use kpg_common::Sompi;
use serde::{Deserialize, Serialize};

/// Response body of `GET /addresses/{address}/balance`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressBalance {
    #[serde(default)]
    pub address: String,
    /// Balance in sompi, the smallest unit.
    pub balance: Sompi,
}

/// One output of an on-chain transaction as reported by the indexer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionOutput {
    #[serde(default)]
    pub script_public_key_address: String,
    /// Output amount in sompi.
    pub amount: Sompi,
}

/// One transaction from `GET /addresses/{address}/full-transactions`.
///
/// Indexer deployments disagree on the timestamp field name; `block_time` (milliseconds) is the
/// official one, `timestamp` appears on older deployments. [`Self::observed_at`] normalizes both.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionDetail {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub is_accepted: Option<bool>,
    #[serde(default)]
    pub outputs: Vec<TransactionOutput>,
}

impl TransactionDetail {
    /// The time this transaction was observed on-chain, if the indexer reported one.
    /// `block_time` is in milliseconds since the epoch; `timestamp` in seconds.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        if let Some(ms) = self.block_time {
            return Utc.timestamp_millis_opt(ms).single();
        }
        self.timestamp.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// The full-transactions endpoint returns either a bare array or an object wrapping one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransactionPage {
    Wrapped { transactions: Vec<TransactionDetail> },
    Bare(Vec<TransactionDetail>),
}

impl TransactionPage {
    pub fn into_transactions(self) -> Vec<TransactionDetail> {
        match self {
            TransactionPage::Wrapped { transactions } => transactions,
            TransactionPage::Bare(transactions) => transactions,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn observed_at_prefers_block_time() {
        let tx = TransactionDetail {
            transaction_id: "abc".into(),
            block_time: Some(1_700_000_000_500),
            timestamp: Some(1),
            is_accepted: None,
            outputs: vec![],
        };
        assert_eq!(tx.observed_at().unwrap().timestamp_millis(), 1_700_000_000_500);
    }

    #[test]
    fn transaction_page_accepts_both_shapes() {
        let wrapped: TransactionPage = serde_json::from_str(
            r#"{"transactions": [{"transaction_id": "t1", "outputs": [{"script_public_key_address": "kaspa:q0", "amount": 5}]}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_transactions().len(), 1);

        let bare: TransactionPage = serde_json::from_str(r#"[{"transaction_id": "t2"}]"#).unwrap();
        let txs = bare.into_transactions();
        assert_eq!(txs[0].transaction_id, "t2");
        assert!(txs[0].observed_at().is_none());
    }
}
