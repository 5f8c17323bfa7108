use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// currency scale used for every stored amount
pub const CURRENCY_DP: u32 = 2;

/// Money type with two decimal places (cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal, rounding half away from zero to cents
    pub fn from_decimal(d: Decimal) -> Self {
        Money(round_currency(d))
    }

    /// create from string, refusing anything finer than a cent
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        let d = Decimal::from_str(s.trim())?;
        if d.normalize().scale() > CURRENCY_DP {
            return Err(rust_decimal::Error::ErrorString(format!(
                "{} has more than {} decimal places",
                s, CURRENCY_DP
            )));
        }
        Ok(Money(d))
    }

    /// create from integer amount (whole currency units)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (cents)
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, CURRENCY_DP))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly below zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// true when the amount carries no fraction of a cent
    pub fn is_whole_cents(&self) -> bool {
        self.0.normalize().scale() <= CURRENCY_DP
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// subtraction floored at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Money::ZERO)
    }

    /// multiply by a whole number of periods
    pub fn times(self, count: u32) -> Self {
        Money(self.0 * Decimal::from(count))
    }

    /// how many whole `unit`s fit in this amount, rounded up
    pub fn ceil_units(self, unit: Money) -> Option<u32> {
        if !unit.is_positive() {
            return None;
        }
        (self.0 / unit.0).ceil().to_u32()
    }

    /// how many whole `unit`s fit in this amount, rounded down
    pub fn floor_units(self, unit: Money) -> Option<u32> {
        if !unit.is_positive() {
            return None;
        }
        (self.0 / unit.0).floor().to_u32()
    }
}

fn round_currency(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.round_dp(CURRENCY_DP))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money(round_currency(self.0 * other))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money(round_currency(self.0 / other))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

/// rate type for ratios and percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// create from decimal (e.g., 0.9 for 90%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 90 for 90%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// get as decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// get as percentage
    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    /// apply to an amount without rounding, for threshold comparisons
    pub fn of(&self, amount: Money) -> Decimal {
        amount.as_decimal() * self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_to_cents() {
        let m = Money::from_decimal(dec!(100.125));
        assert_eq!(m.to_string(), "100.13");

        let m = Money::from_decimal(dec!(100.124));
        assert_eq!(m.to_string(), "100.12");
    }

    #[test]
    fn test_exact_parsing_refuses_sub_cent_amounts() {
        assert_eq!(Money::from_str_exact("250.50").unwrap(), Money::from_minor(25_050));
        assert!(Money::from_str_exact("250.505").is_err());
        assert!("abc".parse::<Money>().is_err());
        // trailing zeros beyond cents are fine
        assert!(Money::from_str_exact("10.5000").is_ok());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::from_minor(100), Money::ONE);
        assert_eq!(Money::from_minor(1), Money::CENT);
    }

    #[test]
    fn test_unit_counting() {
        let rent = Money::from_major(10_000);
        assert_eq!(Money::from_major(25_000).ceil_units(rent), Some(3));
        assert_eq!(Money::from_major(25_000).floor_units(rent), Some(2));
        assert_eq!(Money::from_major(30_000).ceil_units(rent), Some(3));
        assert_eq!(Money::ZERO.ceil_units(rent), Some(0));
        assert_eq!(Money::from_major(1).ceil_units(Money::ZERO), None);
    }

    #[test]
    fn test_saturating_sub_and_sum() {
        let a = Money::from_major(5);
        let b = Money::from_major(8);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_major(3));

        let total: Money = vec![a, b, Money::CENT].into_iter().sum();
        assert_eq!(total, Money::from_minor(1_301));
    }

    #[test]
    fn test_rate_threshold() {
        let ratio = Rate::from_percentage(90);
        assert_eq!(ratio.of(Money::from_major(10_000)), dec!(9000));
        assert_eq!(ratio.to_string(), "90%");
    }
}
