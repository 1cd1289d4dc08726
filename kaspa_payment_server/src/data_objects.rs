use chrono::{DateTime, Utc};
use kaspa_payment_engine::{db_types::PaymentRecord, ExchangeRate, OrderCheckResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInitiateRequest {
    pub customer_id: String,
    /// Order total in the fiat currency's minor unit (cents).
    pub fiat_total_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualConfirmRequest {
    /// Identity of the administrator authorizing the confirmation. Authentication happens
    /// upstream (reverse proxy or hosting application); the gateway records who it was told.
    pub actor: String,
    /// On-chain transaction id, when the administrator has one. Omitted, a synthetic marker is
    /// recorded instead.
    pub txid: Option<String>,
}

/// The customer-facing view of a payment. Internal states collapse to a coarse status so that
/// storefront code never needs to understand the engine's state machine.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
    pub order_id: String,
    /// One of "pending", "completed", "abandoned" or "error".
    pub status: String,
    /// The receiving address, or a `pending-` placeholder while derivation is in flight.
    pub payment_address: String,
    pub expected_amount_sompi: i64,
    pub expected_amount_kas: f64,
    pub currency: String,
    pub rate: f64,
    pub txid: Option<String>,
}

impl PaymentStatusResponse {
    pub fn from_record(record: &PaymentRecord) -> Self {
        let status = if record.status.is_confirmed() {
            "completed"
        } else if record.status.is_terminal() {
            "abandoned"
        } else {
            "pending"
        };
        Self::with_status(record, status)
    }

    pub fn from_check_result(result: &OrderCheckResult) -> Self {
        match result {
            OrderCheckResult::CheckFailed(record) => Self::with_status(record, "error"),
            other => Self::from_record(other.record()),
        }
    }

    fn with_status(record: &PaymentRecord, status: &str) -> Self {
        Self {
            order_id: record.order_id.as_str().to_string(),
            status: status.to_string(),
            payment_address: record.display_address(),
            expected_amount_sompi: record.expected_amount.value(),
            expected_amount_kas: record.expected_amount.as_kas(),
            currency: record.currency.clone(),
            rate: record.rate,
            txid: record.confirmed_txid.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRateResult {
    pub currency: String,
    /// Units of fiat per one KAS.
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

impl From<ExchangeRate> for ExchangeRateResult {
    fn from(rate: ExchangeRate) -> Self {
        Self { currency: rate.base_currency, rate: rate.rate, updated_at: rate.updated_at }
    }
}
