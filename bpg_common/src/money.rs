use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const EUR_CURRENCY_CODE: &str = "EUR";

//--------------------------------------       Money        ----------------------------------------------------------
/// A monetary amount in euro cents.
///
/// All order totals, refund amounts and fees in the payment gateway are represented as integer cents to keep
/// arithmetic exact. Conversion to the fractional euro amounts that the Buckaroo wire format wants only happens at
/// the serialization boundary, via [`Money::to_euros`].
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in euro cents: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<f64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let cents = (value * 100.0).round();
        if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
            Err(MoneyConversionError(format!("Value {value} is out of range for Money")))
        } else {
            #[allow(clippy::cast_possible_truncation)]
            Ok(Self(cents as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "€{:0.2}", self.to_euros())
    }
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_euros(euros: i64) -> Self {
        Self(euros * 100)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The fractional euro amount, as used by the Buckaroo JSON wire format.
    pub fn to_euros(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Money::from_euros(100);
        let b = Money::from_cents(250);
        assert_eq!(a - b, Money::from_cents(9750));
        assert_eq!(a + b, Money::from_cents(10250));
        assert_eq!(-b, Money::from_cents(-250));
        assert!((Money::from_cents(100) - b).is_negative());
    }

    #[test]
    fn euro_conversion() {
        assert_eq!(Money::try_from(97.5).unwrap(), Money::from_cents(9750));
        assert_eq!(Money::from_cents(9750).to_euros(), 97.5);
        assert_eq!(Money::from_cents(9750).to_string(), "€97.50");
    }
}
