use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const KAS_CURRENCY_CODE: &str = "KAS";

/// Number of sompi in one KAS. Sompi is the indivisible base unit of Kaspa.
pub const SOMPI_PER_KAS: i64 = 100_000_000;

//--------------------------------------      Sompi       ------------------------------------------------------------
/// An amount of Kaspa, in sompi. All on-chain amounts in the gateway are integers in the smallest
/// currency unit; fractional KAS values only exist at the presentation layer.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Sompi(i64);

op!(binary Sompi, Add, add);
op!(binary Sompi, Sub, sub);
op!(inplace Sompi, SubAssign, sub_assign);
op!(unary Sompi, Neg, neg);

impl Mul<i64> for Sompi {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Sompi {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in sompi: {0}")]
pub struct SompiConversionError(String);

impl From<i64> for Sompi {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Sompi {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Sompi {}

impl TryFrom<u64> for Sompi {
    type Error = SompiConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(SompiConversionError(format!("Value {} is too large to convert to Sompi", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Sompi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() < 10_000 {
            write!(f, "{} sompi", self.0)
        } else {
            write!(f, "{:0.8} {KAS_CURRENCY_CODE}", self.as_kas())
        }
    }
}

impl Sompi {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_kas(kas: i64) -> Self {
        Self(kas * SOMPI_PER_KAS)
    }

    /// The amount as a fractional KAS value. Presentation only; never feed this back into
    /// amount-matching logic.
    pub fn as_kas(&self) -> f64 {
        self.0 as f64 / SOMPI_PER_KAS as f64
    }
}
