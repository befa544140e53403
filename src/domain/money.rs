use crate::error::{PaymentError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer currency amount (cents) as exchanged with the payments API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    pub const ZERO: Self = Self(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Sums amounts, failing instead of wrapping when the total leaves the
    /// `i64` range.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
            .ok_or_else(|| PaymentError::ValidationError("Total amount is out of range".to_string()))
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decimal currency amount as stored and displayed locally.
///
/// Amounts held by local records always carry two decimal places; the remote
/// API only ever sees the [`MinorUnits`] equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a strictly positive amount.
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Smallest amount accepted for a payout.
    pub fn min_payout() -> Self {
        Self(Decimal::new(50, 2))
    }

    pub fn from_minor_units(units: MinorUnits) -> Self {
        Self(Decimal::new(units.0, 2))
    }

    /// Converts to cents, rounding half away from zero.
    pub fn to_minor_units(&self) -> Result<MinorUnits> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| cents.to_i64())
            .map(MinorUnits)
            .ok_or_else(|| PaymentError::ValidationError(format!("Amount {} is out of range", self.0)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-5.00)),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_to_minor_units_rounds() {
        let amount = Amount::new(dec!(60.00)).unwrap();
        assert_eq!(amount.to_minor_units().unwrap(), MinorUnits(6000));

        let amount = Amount::new(dec!(0.505)).unwrap();
        assert_eq!(amount.to_minor_units().unwrap(), MinorUnits(51));

        let amount = Amount::new(dec!(19.994)).unwrap();
        assert_eq!(amount.to_minor_units().unwrap(), MinorUnits(1999));
    }

    #[test]
    fn test_from_minor_units() {
        let amount = Amount::from_minor_units(MinorUnits(10050));
        assert_eq!(amount.value(), dec!(100.50));
        assert_eq!(amount.to_string(), "100.50");
    }

    #[test]
    fn test_minor_units_sum() {
        let total = MinorUnits::checked_sum([MinorUnits(6000), MinorUnits(5000)]).unwrap();
        assert_eq!(total, MinorUnits(11000));
    }

    #[test]
    fn test_minor_units_sum_overflow_is_an_error() {
        let half = MinorUnits(5_000_000_000_000_000_000);
        assert!(matches!(
            MinorUnits::checked_sum([half, half]),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_to_minor_units_out_of_range() {
        let huge = Amount::new(Decimal::MAX).unwrap();
        assert!(matches!(
            huge.to_minor_units(),
            Err(PaymentError::ValidationError(_))
        ));

        // Fits a Decimal once multiplied, but not an i64.
        let large = Amount::new(dec!(500000000000000000)).unwrap();
        assert!(large.to_minor_units().is_err());
    }
}
