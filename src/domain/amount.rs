use crate::error::{PayError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Number of minor units (fen) in one major unit (yuan).
pub const MINOR_UNITS_PER_MAJOR: Decimal = dec!(100);

/// A non-negative monetary amount in major currency units.
///
/// Wraps `rust_decimal::Decimal` so that prices never pass through binary
/// floating point on their way to the wire.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(PayError::ArithmeticError(format!(
                "amount must not be negative: {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to the integer minor-unit value used by `total_fee`,
    /// `refund_fee` and `amount`.
    pub fn to_minor_units(&self) -> Result<i64> {
        to_minor_units(self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PayError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Multiplies by 100 and rounds half away from zero to a whole number of
/// minor units.
///
/// The gateway's own upper limit on a single transaction is a caller-side
/// precondition; this only rejects negative input and values that do not fit
/// in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount < Decimal::ZERO {
        return Err(PayError::ArithmeticError(format!(
            "amount must not be negative: {amount}"
        )));
    }
    let scaled = amount
        .checked_mul(MINOR_UNITS_PER_MAJOR)
        .ok_or_else(|| PayError::ArithmeticError(format!("amount overflows: {amount}")))?;
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PayError::ArithmeticError(format!("amount overflows: {amount}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(to_minor_units(dec!(12.345)).unwrap(), 1235);
        assert_eq!(to_minor_units(dec!(10.00)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(0.005)).unwrap(), 1);
        assert_eq!(to_minor_units(dec!(0.004)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(9.99)).unwrap(), 999);
    }

    #[test]
    fn test_no_float_drift() {
        // 0.29 * 100 is 28.999999999999996 in f64
        assert_eq!(to_minor_units(dec!(0.29)).unwrap(), 29);
        assert_eq!(to_minor_units(dec!(1.15)).unwrap(), 115);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = to_minor_units(dec!(-0.01)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(PayError::ArithmeticError(_))
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(PayError::ArithmeticError(_))
        ));
    }

    #[test]
    fn test_deserialize_validates_sign() {
        let amount: Amount = serde_json::from_str("\"9.99\"").unwrap();
        assert_eq!(amount.value(), dec!(9.99));
        assert!(serde_json::from_str::<Amount>("\"-1.00\"").is_err());
    }

    #[test]
    fn test_amount_value_object() {
        let amount: Amount = dec!(88.8).try_into().unwrap();
        assert_eq!(amount.value(), dec!(88.8));
        assert_eq!(amount.to_minor_units().unwrap(), 8880);
        assert_eq!(Decimal::from(amount), dec!(88.8));
        assert!(Amount::new(Decimal::ZERO).is_ok());
    }
}
