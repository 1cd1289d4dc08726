//! Payment detection against the chain indexer.
//!
//! The checker answers one question: has a qualifying payment for this order landed at its
//! address? A transaction qualifies when it is accepted, pays the order's address at least the
//! expected amount less the tolerance, and was observed strictly after the order's payment window
//! opened. Overpayment confirms; underpayment beyond the tolerance never does.

use chrono::{DateTime, Utc};
use kpg_common::Sompi;
use log::*;

use crate::{
    db_types::KaspaAddress,
    traits::{ChainIndexer, ChainIndexerError},
};

/// Default matching tolerance. Absorbs sub-sompi rounding in the fiat conversion without letting
/// any meaningful underpayment through.
pub const DEFAULT_TOLERANCE: Sompi = Sompi::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFound {
    pub txid: String,
    pub amount: Sompi,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCheck {
    Found(PaymentFound),
    NotFound,
}

/// Stateless matcher over a [`ChainIndexer`]. Cheap to clone; every check is an independent
/// round-trip to the indexer.
#[derive(Debug, Clone)]
pub struct PaymentChecker<C: ChainIndexer> {
    indexer: C,
    tolerance: Sompi,
}

impl<C: ChainIndexer> PaymentChecker<C> {
    pub fn new(indexer: C, tolerance: Sompi) -> Self {
        Self { indexer, tolerance }
    }

    /// Look for a qualifying payment to `address`.
    ///
    /// With a `since` boundary, the transaction history is scanned and only transactions observed
    /// strictly after the boundary can match; the first qualifying transaction wins. Without a
    /// boundary there is no way to tell old funds from new, so the current address balance is
    /// used instead, with a synthetic transaction id recording how the confirmation was reached.
    ///
    /// Indexer failures propagate as errors. "No payment yet" and "could not ask" are different
    /// answers and callers treat them differently.
    pub async fn check_payment(
        &self,
        address: &KaspaAddress,
        expected: Sompi,
        since: Option<DateTime<Utc>>,
    ) -> Result<PaymentCheck, ChainIndexerError> {
        let threshold = expected - self.tolerance;
        match since {
            Some(since) => self.check_transactions(address, threshold, since).await,
            None => self.check_balance(address, threshold).await,
        }
    }

    async fn check_transactions(
        &self,
        address: &KaspaAddress,
        threshold: Sompi,
        since: DateTime<Utc>,
    ) -> Result<PaymentCheck, ChainIndexerError> {
        let transactions = self.indexer.transactions_for(address).await?;
        trace!("🔎️ {} transactions on record for {address}", transactions.len());
        for tx in &transactions {
            if !tx.accepted {
                continue;
            }
            let Some(observed_at) = tx.observed_at else { continue };
            if observed_at <= since {
                continue;
            }
            let amount = tx.amount_to(address);
            if amount >= threshold {
                debug!("🔎️ Payment found for {address}: {amount} in {} at {observed_at}", tx.txid);
                return Ok(PaymentCheck::Found(PaymentFound { txid: tx.txid.clone(), amount, observed_at }));
            }
        }
        Ok(PaymentCheck::NotFound)
    }

    async fn check_balance(&self, address: &KaspaAddress, threshold: Sompi) -> Result<PaymentCheck, ChainIndexerError> {
        let balance = self.indexer.balance_of(address).await?;
        if balance >= threshold {
            let observed_at = Utc::now();
            let txid = format!("balance-confirmed-{}", observed_at.timestamp());
            debug!("🔎️ Balance of {address} covers the expected amount ({balance}); recording as {txid}");
            return Ok(PaymentCheck::Found(PaymentFound { txid, amount: balance, observed_at }));
        }
        Ok(PaymentCheck::NotFound)
    }
}
