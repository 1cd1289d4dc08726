use crate::{
    db_types::{KaspaAddress, NewPaymentRecord, OrderId, PaymentConfirmation, PaymentRecord},
    traits::{data_objects::TransitionOutcome, PaymentGatewayError},
};

/// The persistence seam of the payment engine.
///
/// Every state transition in the implementation must be a guarded, atomic write (conditional on
/// the current status), so that concurrent callers racing the same order resolve to exactly one
/// winner and the losers observe the winner's result. The payment flow API relies on this rather
/// than taking locks of its own.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Create the payment record for an order in `AwaitingAddress`, or return the existing record
    /// untouched if one already exists. The boolean is true when a new record was inserted.
    ///
    /// Repeat initiations never overwrite the expected amount or the rate snapshot.
    async fn insert_payment_record(
        &self,
        record: &NewPaymentRecord,
    ) -> Result<(PaymentRecord, bool), PaymentGatewayError>;

    /// Fetch the payment record for the order, or [`PaymentGatewayError::RecordNotFound`].
    async fn fetch_payment_record(&self, order_id: &OrderId) -> Result<PaymentRecord, PaymentGatewayError>;

    /// Atomically allocate the next derivation index for the account. Each call returns a value
    /// strictly greater than every previous return for that account, across all concurrent
    /// callers. Allocated indexes are consumed even if the caller never uses them; gaps are
    /// harmless, reuse is not.
    async fn next_derivation_index(&self, account: &str) -> Result<i64, PaymentGatewayError>;

    /// Bump the allocator past `index` for the account, so that future allocations stay above
    /// indexes that were assigned out-of-band (e.g. seeded from an existing wallet).
    async fn record_index_used(&self, account: &str, index: i64) -> Result<(), PaymentGatewayError>;

    /// Attach a derived address to the order, transitioning `AwaitingAddress` to
    /// `AwaitingPayment`. The write is conditional on the record still being in
    /// `AwaitingAddress`; if a concurrent caller already attached an address, `Ok(None)` is
    /// returned and the caller should re-fetch.
    async fn attach_address(
        &self,
        order_id: &OrderId,
        address: &KaspaAddress,
        index: i64,
    ) -> Result<Option<PaymentRecord>, PaymentGatewayError>;

    /// Record a payment confirmation against the order.
    ///
    /// * `AwaitingPayment` records move to the confirmation's target status and the confirmation
    ///   details are stored, exactly once, no matter how many callers race.
    /// * Records already in a terminal state are left untouched and reported as
    ///   [`TransitionOutcome::AlreadySettled`].
    /// * `AwaitingAddress` records cannot be confirmed and yield
    ///   [`PaymentGatewayError::TransitionForbidden`].
    async fn confirm_payment(
        &self,
        order_id: &OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<TransitionOutcome, PaymentGatewayError>;

    /// Move an `AwaitingPayment` record to `Abandoned`. Terminal records are a silent no-op
    /// ([`TransitionOutcome::AlreadySettled`]).
    async fn mark_abandoned(&self, order_id: &OrderId) -> Result<TransitionOutcome, PaymentGatewayError>;

    /// The orders currently awaiting payment, oldest `payment_started_at` first, capped at
    /// `limit`. This is the poll scheduler's work queue.
    async fn fetch_awaiting_payment(&self, limit: i64) -> Result<Vec<PaymentRecord>, PaymentGatewayError>;

    /// Close the database connection.
    async fn close(&self) -> Result<(), PaymentGatewayError>;
}
