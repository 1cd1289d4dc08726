use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    checker::{PaymentCheck, PaymentChecker},
    db_types::{NewPaymentRecord, OrderId, PaymentConfirmation, PaymentRecord, PaymentStatusType, WatchOnlyKey},
    deriver::AddressDeriver,
    events::{EventProducers, PaymentAbandonedEvent, PaymentConfirmedEvent},
    kpe_api::{
        exchange_objects::ExchangeRate,
        flow_objects::{FlowConfig, OrderCheckResult, PaymentInitiation, SweepResult},
    },
    traits::{ChainIndexer, PaymentGatewayDatabase, PaymentGatewayError, TransitionOutcome},
};

/// `PaymentFlowApi` is the primary API of the engine. It owns the payment lifecycle of an order:
/// record creation and address assignment at checkout, on-demand and background payment checks,
/// manual confirmation, and abandonment.
///
/// All state transitions delegate to guarded writes in the database backend, so any number of
/// concurrent callers (customer page refreshes, the background sweeper, an administrator)
/// converge on a single outcome per order.
pub struct PaymentFlowApi<B, D, C>
where C: ChainIndexer
{
    db: B,
    deriver: D,
    checker: PaymentChecker<C>,
    key: WatchOnlyKey,
    producers: EventProducers,
    config: FlowConfig,
}

impl<B, D, C: ChainIndexer> Debug for PaymentFlowApi<B, D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, D, C> PaymentFlowApi<B, D, C>
where
    B: PaymentGatewayDatabase,
    D: AddressDeriver,
    C: ChainIndexer,
{
    pub fn new(
        db: B,
        deriver: D,
        checker: PaymentChecker<C>,
        key: WatchOnlyKey,
        producers: EventProducers,
        config: FlowConfig,
    ) -> Self {
        Self { db, deriver, checker, key, producers, config }
    }

    /// Begin accepting payment for an order.
    ///
    /// Creates the payment record with the expected amount fixed from the given rate snapshot,
    /// then derives and attaches a unique receiving address. Idempotent: repeat calls for the
    /// same order return the existing record, original amount and rate snapshot intact, and a
    /// repeat call is also how a record stuck in `AwaitingAddress` (after an earlier derivation
    /// failure) gets its address.
    pub async fn initiate_payment(
        &self,
        order_id: OrderId,
        customer_id: String,
        fiat_total_cents: i64,
        rate: &ExchangeRate,
    ) -> Result<PaymentInitiation, PaymentGatewayError> {
        let expected = rate.convert_cents(fiat_total_cents);
        let mut new_record = NewPaymentRecord::new(order_id.clone(), customer_id, fiat_total_cents, rate.rate, expected);
        new_record.currency = rate.base_currency.clone();
        let (record, newly_created) = self.db.insert_payment_record(&new_record).await?;
        if newly_created {
            debug!("🔄️📦️ Created payment record for order {order_id}. Expecting {expected}.");
        } else {
            trace!("🔄️📦️ Order {order_id} already has a payment record. Returning it unchanged.");
        }
        let record = self.ensure_address(record).await?;
        Ok(PaymentInitiation { record, newly_created })
    }

    /// Make sure the record has a receiving address, allocating an index and deriving one if it
    /// does not.
    ///
    /// If a concurrent caller attaches an address first, theirs wins and ours is discarded; the
    /// allocated index is simply never used. Gaps in the index sequence are harmless.
    async fn ensure_address(&self, record: PaymentRecord) -> Result<PaymentRecord, PaymentGatewayError> {
        if record.payment_address.is_some() || record.status != PaymentStatusType::AwaitingAddress {
            return Ok(record);
        }
        let order_id = record.order_id.clone();
        let index = self.db.next_derivation_index(self.key.as_str()).await?;
        let derived = self.deriver.derive_one(&self.key, index).await?;
        match self.db.attach_address(&order_id, &derived.address, derived.index).await? {
            Some(updated) => {
                info!("🔄️📦️ Order {order_id} is awaiting payment at {} (index {})", derived.address, derived.index);
                Ok(updated)
            },
            None => {
                debug!("🔄️📦️ Lost the address race for order {order_id}; keeping the winner's address.");
                self.db.fetch_payment_record(&order_id).await
            },
        }
    }

    /// Check one order for payment right now. Driven by the customer-facing "check payment"
    /// endpoint; the background sweep runs the same logic.
    pub async fn check_order_now(&self, order_id: &OrderId) -> Result<OrderCheckResult, PaymentGatewayError> {
        let record = self.db.fetch_payment_record(order_id).await?;
        self.check_and_transition(record).await
    }

    /// Confirm an order's payment on an administrator's authority, without consulting the chain.
    ///
    /// Only `AwaitingPayment` orders can be manually confirmed. Already-settled orders return
    /// the stored record unchanged; `AwaitingAddress` orders are rejected.
    pub async fn manually_confirm(
        &self,
        order_id: &OrderId,
        txid: Option<String>,
        actor: &str,
    ) -> Result<PaymentRecord, PaymentGatewayError> {
        let record = self.db.fetch_payment_record(order_id).await?;
        if record.status == PaymentStatusType::AwaitingAddress {
            return Err(PaymentGatewayError::TransitionForbidden {
                order_id: order_id.as_str().to_string(),
                status: record.status.to_string(),
            });
        }
        let confirmation = PaymentConfirmation::manual(txid, record.expected_amount, actor);
        info!("🔄️✅️ Order {order_id} is being manually confirmed by {actor} with txid {}", confirmation.txid);
        let outcome = self.db.confirm_payment(order_id, &confirmation).await?;
        if outcome.was_applied() {
            self.producers.publish_confirmed(PaymentConfirmedEvent::new(outcome.record().clone())).await;
        } else {
            debug!("🔄️✅️ Order {order_id} was already settled. Manual confirmation is a no-op.");
        }
        Ok(outcome.into_record())
    }

    /// Run one sweep over the awaiting-payment queue, oldest first.
    ///
    /// Each order gets at most one indexer round-trip. Indexer failures are counted and skipped;
    /// they never settle an order in either direction. The sweep stops early when its time budget
    /// runs out and picks up where the queue ordering puts it next time.
    pub async fn sweep_once(&self) -> Result<SweepResult, PaymentGatewayError> {
        let started = std::time::Instant::now();
        let queue = self.db.fetch_awaiting_payment(self.config.sweep_batch_size).await?;
        let mut result = SweepResult::default();
        for record in queue {
            if started.elapsed() >= self.config.sweep_budget {
                debug!("🕰️ Sweep budget exhausted after {} orders. Remainder deferred to the next tick.", result.checked);
                result.budget_exhausted = true;
                break;
            }
            let order_id = record.order_id.clone();
            match self.check_and_transition(record).await {
                Ok(OrderCheckResult::ConfirmedNow(_)) => result.confirmed += 1,
                Ok(OrderCheckResult::Abandoned(_)) => result.abandoned += 1,
                Ok(OrderCheckResult::CheckFailed(_)) => result.check_failures += 1,
                Ok(_) => {},
                Err(e) => {
                    // A database error mid-sweep leaves this order as-is; carry on with the rest.
                    warn!("🕰️ Sweep could not process order {order_id}: {e}");
                    result.check_failures += 1;
                },
            }
            result.checked += 1;
        }
        Ok(result)
    }

    /// Fetch the payment record for an order without touching it.
    pub async fn payment_record(&self, order_id: &OrderId) -> Result<PaymentRecord, PaymentGatewayError> {
        self.db.fetch_payment_record(order_id).await
    }

    /// The shared check path for on-demand checks and the sweep.
    ///
    /// Ordering matters here: terminal records short-circuit before any network call, the
    /// abandonment ceiling is applied before the indexer is consulted, and an indexer failure
    /// leaves the record untouched.
    async fn check_and_transition(&self, record: PaymentRecord) -> Result<OrderCheckResult, PaymentGatewayError> {
        let order_id = record.order_id.clone();
        if record.status.is_terminal() {
            return Ok(OrderCheckResult::Completed(record));
        }
        if record.status == PaymentStatusType::AwaitingAddress {
            return Ok(OrderCheckResult::AddressPending(record));
        }
        let age = Utc::now() - record.payment_started_at;
        if age > self.config.abandon_after {
            info!("🔄️🗑️ Order {order_id} has waited {}h for payment. Abandoning it.", age.num_hours());
            let outcome = self.db.mark_abandoned(&order_id).await?;
            if outcome.was_applied() {
                self.producers.publish_abandoned(PaymentAbandonedEvent::new(outcome.record().clone())).await;
                return Ok(OrderCheckResult::Abandoned(outcome.into_record()));
            }
            return Ok(OrderCheckResult::Completed(outcome.into_record()));
        }
        let address = record.payment_address.clone().ok_or_else(|| {
            PaymentGatewayError::DatabaseError(format!("Order {order_id} is AwaitingPayment but has no address"))
        })?;
        let check =
            match self.checker.check_payment(&address, record.expected_amount, Some(record.payment_started_at)).await {
                Ok(check) => check,
                Err(e) => {
                    warn!("🔄️📡️ Could not check order {order_id} against the chain: {e}");
                    return Ok(OrderCheckResult::CheckFailed(record));
                },
            };
        match check {
            PaymentCheck::NotFound => Ok(OrderCheckResult::Pending(record)),
            PaymentCheck::Found(found) => {
                let confirmation = PaymentConfirmation::automatic(found.txid, found.amount, found.observed_at);
                let outcome = self.db.confirm_payment(&order_id, &confirmation).await?;
                match outcome {
                    TransitionOutcome::Applied(updated) => {
                        info!(
                            "🔄️✅️ Order {order_id} confirmed: {} received in {}",
                            confirmation.amount, confirmation.txid
                        );
                        self.producers.publish_confirmed(PaymentConfirmedEvent::new(updated.clone())).await;
                        Ok(OrderCheckResult::ConfirmedNow(updated))
                    },
                    TransitionOutcome::AlreadySettled(existing) => {
                        debug!("🔄️✅️ Order {order_id} was settled by a concurrent check. Keeping the first result.");
                        Ok(OrderCheckResult::Completed(existing))
                    },
                }
            },
        }
    }
}
