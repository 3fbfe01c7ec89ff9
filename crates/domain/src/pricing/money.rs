//! Money and tax-rate value objects.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::PricingError;

/// An amount in the store currency's minor unit.
///
/// Integer minor units keep sums exact; fractional amounts only exist
/// transiently as [`Decimal`] inside the calculator and are turned back into
/// `Money` with [`Money::round_half_up`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates an amount from minor units.
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, failing on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Result<Money, PricingError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Money)
            .ok_or(PricingError::AmountOverflow)
    }

    /// Adds two amounts, failing on overflow.
    pub fn checked_add(&self, rhs: Money) -> Result<Money, PricingError> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or(PricingError::AmountOverflow)
    }

    pub fn checked_sub(&self, rhs: Money) -> Result<Money, PricingError> {
        self.0
            .checked_sub(rhs.0)
            .map(Money)
            .ok_or(PricingError::AmountOverflow)
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Rounds a fractional minor-unit amount to a whole minor unit, half up.
    pub fn round_half_up(amount: Decimal) -> Result<Money, PricingError> {
        amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Money)
            .ok_or(PricingError::AmountOverflow)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// VAT rate as a fraction in `[0, 1]`, e.g. `0.10` for 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub const ZERO: TaxRate = TaxRate(Decimal::ZERO);

    pub fn new(rate: Decimal) -> Result<Self, PricingError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(PricingError::TaxRateOutOfRange(rate));
        }
        Ok(Self(rate))
    }

    /// Builds a rate from whole percent, e.g. `10` for 10%.
    pub fn from_percent(percent: u32) -> Result<Self, PricingError> {
        Self::new(Decimal::from(percent) / Decimal::ONE_HUNDRED)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = PricingError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        Self::new(rate)
    }
}

impl From<TaxRate> for Decimal {
    fn from(rate: TaxRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for TaxRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_half_up_at_midpoint() {
        assert_eq!(Money::round_half_up(dec!(10.5)).unwrap(), Money::new(11));
        assert_eq!(Money::round_half_up(dec!(10.49)).unwrap(), Money::new(10));
        assert_eq!(Money::round_half_up(dec!(0.5)).unwrap(), Money::new(1));
    }

    #[test]
    fn checked_mul_detects_overflow() {
        assert_eq!(Money::new(200_000).checked_mul(2).unwrap(), Money::new(400_000));
        assert!(matches!(
            Money::new(i64::MAX).checked_mul(2),
            Err(PricingError::AmountOverflow)
        ));
    }

    #[test]
    fn checked_add_and_sub_detect_overflow() {
        assert_eq!(Money::new(1).checked_add(Money::new(2)).unwrap(), Money::new(3));
        assert_eq!(Money::new(5).checked_sub(Money::new(7)).unwrap(), Money::new(-2));
        assert_eq!(
            Money::new(i64::MAX).checked_add(Money::new(1)),
            Err(PricingError::AmountOverflow)
        );
        assert_eq!(
            Money::new(i64::MIN).checked_sub(Money::new(1)),
            Err(PricingError::AmountOverflow)
        );
    }

    #[test]
    fn tax_rate_bounds() {
        assert!(TaxRate::new(dec!(0)).is_ok());
        assert!(TaxRate::new(dec!(1)).is_ok());
        assert!(TaxRate::new(dec!(1.01)).is_err());
        assert!(TaxRate::new(dec!(-0.05)).is_err());
        assert_eq!(TaxRate::from_percent(10).unwrap().as_decimal(), dec!(0.10));
    }

    #[test]
    fn tax_rate_deserialization_is_validated() {
        let ok: TaxRate = serde_json::from_str("\"0.08\"").unwrap();
        assert_eq!(ok.as_decimal(), dec!(0.08));
        assert!(serde_json::from_str::<TaxRate>("\"1.5\"").is_err());
    }

    #[test]
    fn tax_rate_display_as_percent() {
        assert_eq!(TaxRate::from_percent(10).unwrap().to_string(), "10%");
    }

    #[test]
    fn money_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Money::new(440_000)).unwrap(), "440000");
    }
}
