use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use kpg_common::Sompi;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::{is_valid_kaspa_address, is_valid_kpub, normalize_address};

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The order identity as assigned by the external order store. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The placeholder returned to clients while a record is still in `AwaitingAddress`.
    pub fn pending_placeholder(&self) -> String {
        format!("pending-{}", self.0)
    }
}

//--------------------------------------      KaspaAddress      ------------------------------------------------------
/// A receiving address, always stored normalized with the `kaspa:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct KaspaAddress(String);

impl KaspaAddress {
    /// Normalizes and validates the given string. Validation failures are fatal for the
    /// operation at hand; there is never a fallback address.
    pub fn try_new<S: AsRef<str>>(address: S) -> Result<Self, ConversionError> {
        let normalized = normalize_address(address.as_ref());
        if is_valid_kaspa_address(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ConversionError(format!("Invalid Kaspa address format: {}", address.as_ref())))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for KaspaAddress {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

impl Display for KaspaAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      WatchOnlyKey      ------------------------------------------------------
/// The merchant's extended public key. Can derive receiving addresses, cannot spend. Supplied
/// once via configuration and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchOnlyKey(String);

impl WatchOnlyKey {
    pub fn try_new<S: AsRef<str>>(kpub: S) -> Result<Self, ConversionError> {
        let kpub = kpub.as_ref().trim();
        if is_valid_kpub(kpub) {
            Ok(Self(kpub.to_string()))
        } else {
            Err(ConversionError("Invalid watch-only key: expected 'kpub' prefix and >= 100 characters".to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WatchOnlyKey {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

impl Display for WatchOnlyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys are public material, but log lines stay readable with a truncated form. Keys that
        // arrived via deserialization may be short or non-ASCII; print those whole rather than
        // slice mid-character.
        if self.0.len() <= 14 || !self.0.is_ascii() {
            f.write_str(&self.0)
        } else {
            write!(f, "{}…{}", &self.0[..8], &self.0[self.0.len() - 6..])
        }
    }
}

//--------------------------------------   PaymentStatusType    ------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// The record exists but address derivation has not completed yet.
    AwaitingAddress,
    /// A unique receiving address has been assigned and the chain is being polled.
    AwaitingPayment,
    /// A matching payment was observed on-chain. Terminal.
    Confirmed,
    /// An administrator confirmed the payment out-of-band. Terminal.
    ManuallyConfirmed,
    /// No payment arrived within the abandonment ceiling. Terminal.
    Abandoned,
}

impl PaymentStatusType {
    /// Terminal states are stable: no transition ever leaves them, and state-changing
    /// operations against them are silent no-ops.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::ManuallyConfirmed | Self::Abandoned)
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed | Self::ManuallyConfirmed)
    }
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::AwaitingAddress => write!(f, "AwaitingAddress"),
            PaymentStatusType::AwaitingPayment => write!(f, "AwaitingPayment"),
            PaymentStatusType::Confirmed => write!(f, "Confirmed"),
            PaymentStatusType::ManuallyConfirmed => write!(f, "ManuallyConfirmed"),
            PaymentStatusType::Abandoned => write!(f, "Abandoned"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AwaitingAddress" => Ok(Self::AwaitingAddress),
            "AwaitingPayment" => Ok(Self::AwaitingPayment),
            "Confirmed" => Ok(Self::Confirmed),
            "ManuallyConfirmed" => Ok(Self::ManuallyConfirmed),
            "Abandoned" => Ok(Self::Abandoned),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to AwaitingAddress");
            PaymentStatusType::AwaitingAddress
        })
    }
}

//--------------------------------------     PaymentRecord      ------------------------------------------------------
/// The payment-relevant sub-document of an order. The engine owns these fields; the order record
/// itself lives in the external order store.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    /// Null until derivation completes. Write-once.
    pub payment_address: Option<KaspaAddress>,
    /// Null until derivation completes. Write-once, never reused across orders.
    pub derivation_index: Option<i64>,
    /// Fixed at checkout time from the exchange rate snapshot. Immutable after being set.
    pub expected_amount: Sompi,
    pub fiat_total_cents: i64,
    pub currency: String,
    /// The fiat-per-KAS rate snapshot used to compute `expected_amount`.
    pub rate: f64,
    pub status: PaymentStatusType,
    /// The "since" boundary for transaction matching. Set once at record creation.
    pub payment_started_at: DateTime<Utc>,
    pub confirmed_amount: Option<Sompi>,
    pub confirmed_txid: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Identity of the administrator for manual confirmations; null for automated ones.
    pub confirmed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// The address to show a customer: the real one once derived, otherwise the pending
    /// placeholder.
    pub fn display_address(&self) -> String {
        self.payment_address.as_ref().map(|a| a.to_string()).unwrap_or_else(|| self.order_id.pending_placeholder())
    }
}

//--------------------------------------   NewPaymentRecord     ------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub order_id: OrderId,
    pub customer_id: String,
    pub fiat_total_cents: i64,
    pub currency: String,
    pub rate: f64,
    pub expected_amount: Sompi,
    /// The time payment was initiated. Transactions at or before this instant never match.
    pub payment_started_at: DateTime<Utc>,
}

impl NewPaymentRecord {
    pub fn new(order_id: OrderId, customer_id: String, fiat_total_cents: i64, rate: f64, expected: Sompi) -> Self {
        Self {
            order_id,
            customer_id,
            fiat_total_cents,
            currency: "USD".to_string(),
            rate,
            expected_amount: expected,
            payment_started_at: Utc::now(),
        }
    }
}

//--------------------------------------  PaymentConfirmation   ------------------------------------------------------
/// Everything written atomically with the AwaitingPayment → Confirmed/ManuallyConfirmed
/// transition.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub txid: String,
    pub amount: Sompi,
    pub observed_at: DateTime<Utc>,
    /// Set for administrator overrides; selects the `ManuallyConfirmed` terminal state.
    pub confirmed_by: Option<String>,
}

impl PaymentConfirmation {
    pub fn automatic(txid: String, amount: Sompi, observed_at: DateTime<Utc>) -> Self {
        Self { txid, amount, observed_at, confirmed_by: None }
    }

    pub fn manual(txid: Option<String>, amount: Sompi, actor: &str) -> Self {
        let now = Utc::now();
        let txid = txid.unwrap_or_else(|| format!("manually-verified-{}", now.timestamp()));
        Self { txid, amount, observed_at: now, confirmed_by: Some(actor.to_string()) }
    }

    pub fn target_status(&self) -> PaymentStatusType {
        if self.confirmed_by.is_some() {
            PaymentStatusType::ManuallyConfirmed
        } else {
            PaymentStatusType::Confirmed
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trip() {
        for s in ["AwaitingAddress", "AwaitingPayment", "Confirmed", "ManuallyConfirmed", "Abandoned"] {
            let status: PaymentStatusType = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("Paid".parse::<PaymentStatusType>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!PaymentStatusType::AwaitingAddress.is_terminal());
        assert!(!PaymentStatusType::AwaitingPayment.is_terminal());
        assert!(PaymentStatusType::Confirmed.is_terminal());
        assert!(PaymentStatusType::ManuallyConfirmed.is_terminal());
        assert!(PaymentStatusType::Abandoned.is_terminal());
        assert!(PaymentStatusType::ManuallyConfirmed.is_confirmed());
        assert!(!PaymentStatusType::Abandoned.is_confirmed());
    }

    #[test]
    fn address_normalization_on_construction() {
        let body = "q".repeat(61);
        let addr = KaspaAddress::try_new(&body).unwrap();
        assert_eq!(addr.as_str(), format!("kaspa:{body}"));
        assert!(KaspaAddress::try_new("kaspa:nope").is_err());
    }

    #[test]
    fn key_display_truncates_without_panicking() {
        let valid = WatchOnlyKey::try_new(format!("kpub{}", "A1b2".repeat(27))).unwrap();
        let shown = valid.to_string();
        assert!(shown.starts_with("kpubA1b2"));
        assert!(shown.len() < valid.as_str().len());

        // Deserialization bypasses try_new; a short key must print whole, not panic.
        let short: WatchOnlyKey = serde_json::from_str("\"kpubshort\"").unwrap();
        assert_eq!(short.to_string(), "kpubshort");
    }

    #[test]
    fn manual_confirmation_gets_synthetic_txid() {
        let conf = PaymentConfirmation::manual(None, Sompi::from(42), "admin-7");
        assert!(conf.txid.starts_with("manually-verified-"));
        assert_eq!(conf.target_status(), PaymentStatusType::ManuallyConfirmed);
        let conf = PaymentConfirmation::manual(Some("abc123".to_string()), Sompi::from(42), "admin-7");
        assert_eq!(conf.txid, "abc123");
    }
}
