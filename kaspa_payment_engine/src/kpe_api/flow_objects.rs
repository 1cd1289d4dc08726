use chrono::Duration;
use serde::Serialize;

use crate::db_types::PaymentRecord;

pub const DEFAULT_ABANDON_AFTER_HOURS: i64 = 24;
pub const DEFAULT_SWEEP_BATCH_SIZE: i64 = 50;
pub const DEFAULT_SWEEP_BUDGET_SECS: u64 = 25;

/// Tunables of the payment flow. Production values come from the server configuration; tests set
/// them directly.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// How long an order may wait for payment before it is given up on.
    pub abandon_after: Duration,
    /// Maximum number of orders examined per sweep.
    pub sweep_batch_size: i64,
    /// Wall-clock budget for one sweep. Checked between orders so a slow indexer cannot pile
    /// sweeps on top of each other.
    pub sweep_budget: std::time::Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            abandon_after: Duration::hours(DEFAULT_ABANDON_AFTER_HOURS),
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            sweep_budget: std::time::Duration::from_secs(DEFAULT_SWEEP_BUDGET_SECS),
        }
    }
}

/// Result of initiating payment for an order. Initiation is idempotent; `newly_created` tells
/// the caller whether this call created the record or found an existing one.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiation {
    pub record: PaymentRecord,
    pub newly_created: bool,
}

/// Outcome of a single on-demand payment check for one order.
#[derive(Debug, Clone, Serialize)]
pub enum OrderCheckResult {
    /// The order was already settled before this check ran.
    Completed(PaymentRecord),
    /// This check found the payment and committed the confirmation.
    ConfirmedNow(PaymentRecord),
    /// No qualifying payment yet; keep waiting.
    Pending(PaymentRecord),
    /// Address derivation has not completed; there is nothing to check against yet.
    AddressPending(PaymentRecord),
    /// The order passed the abandonment ceiling and was marked abandoned.
    Abandoned(PaymentRecord),
    /// The chain indexer could not be queried. The order is left untouched.
    CheckFailed(PaymentRecord),
}

impl OrderCheckResult {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            OrderCheckResult::Completed(r)
            | OrderCheckResult::ConfirmedNow(r)
            | OrderCheckResult::Pending(r)
            | OrderCheckResult::AddressPending(r)
            | OrderCheckResult::Abandoned(r)
            | OrderCheckResult::CheckFailed(r) => r,
        }
    }
}

/// Tally of one background sweep over the awaiting-payment queue.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepResult {
    pub checked: usize,
    pub confirmed: usize,
    pub abandoned: usize,
    pub check_failures: usize,
    /// True when the sweep stopped early because its time budget ran out.
    pub budget_exhausted: bool,
}
