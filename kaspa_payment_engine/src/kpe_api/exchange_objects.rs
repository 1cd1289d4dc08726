use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use kpg_common::{Sompi, SOMPI_PER_KAS};
use serde::{Deserialize, Serialize};

/// A fiat-per-KAS exchange rate snapshot.
///
/// The snapshot taken at checkout time is stored with the order and fixes the expected amount for
/// the lifetime of that payment, no matter how the market moves afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// ISO 4217 code of the fiat side, e.g. "USD".
    pub base_currency: String,
    /// Units of fiat per one KAS.
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(base_currency: String, rate: f64, updated_at: Option<DateTime<Utc>>) -> Self {
        Self { base_currency, rate, updated_at: updated_at.unwrap_or_else(Utc::now) }
    }

    /// Whether the snapshot is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.updated_at < ttl
    }

    /// Convert a fiat amount in minor units (cents) to sompi at this rate, rounding to the
    /// nearest sompi. The result is what the customer must pay; matching tolerance is applied
    /// elsewhere.
    pub fn convert_cents(&self, cents: i64) -> Sompi {
        let kas = cents as f64 / 100.0 / self.rate;
        Sompi::from((kas * SOMPI_PER_KAS as f64).round() as i64)
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1 KAS => {:.6} {} ({})", self.rate, self.base_currency, self.updated_at)
    }
}
