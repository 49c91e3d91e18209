//! Money and currency types
//!
//! Amounts are exact decimals (`rust_decimal`) so that repeated balance
//! deltas never accumulate floating-point error. The ledger holds two
//! currencies side by side and never converts between them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

/// The closed set of currencies an account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    /// Yemeni rial
    #[serde(rename = "YER")]
    Yer,
    /// Saudi riyal
    #[serde(rename = "SAR")]
    Sar,
}

impl Currency {
    /// All supported currencies, in display order
    pub const ALL: [Currency; 2] = [Currency::Yer, Currency::Sar];

    /// ISO code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Yer => "YER",
            Self::Sar => "SAR",
        }
    }

    /// Parse a currency code (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "YER" => Some(Self::Yer),
            "SAR" => Some(Self::Sar),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount without currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Wrap a decimal amount
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole units, handy in tests and fixtures
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying decimal
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Check if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Get the absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Multiply by a rate (display conversions only)
    pub fn scaled(&self, rate: Decimal) -> Self {
        Self(self.0.saturating_mul(rate))
    }

    /// Sum, or `None` past the decimal range
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Difference, or `None` past the decimal range
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Parse an amount such as "1500", "1,500.25" or "-20"
    ///
    /// Non-numeric input is an error; it is never coerced to zero.
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err(MoneyParseError::Empty);
        }
        Decimal::from_str(&cleaned)
            .map(Self)
            .map_err(|_| MoneyParseError::InvalidFormat(s.trim().to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.round_dp(2).normalize())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

// Operators saturate at the decimal bounds. They serve totals and
// reports; stored balances only change through `checked_add`.
impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, m| acc + *m)
    }
}

/// Per-currency balance pair carried by every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    #[serde(rename = "balanceYER", default)]
    pub yer: Money,
    #[serde(rename = "balanceSAR", default)]
    pub sar: Money,
}

impl Balances {
    /// Both currencies set
    pub fn new(yer: Money, sar: Money) -> Self {
        Self { yer, sar }
    }

    /// Balance held in one currency
    pub fn get(&self, currency: Currency) -> Money {
        match currency {
            Currency::Yer => self.yer,
            Currency::Sar => self.sar,
        }
    }

    pub fn get_mut(&mut self, currency: Currency) -> &mut Money {
        match currency {
            Currency::Yer => &mut self.yer,
            Currency::Sar => &mut self.sar,
        }
    }

    /// Add a signed delta to one currency field
    ///
    /// Fails without touching the balance when the result would leave the
    /// decimal range.
    pub fn apply(&mut self, currency: Currency, delta: Money) -> LedgerResult<()> {
        let balance = self.get_mut(currency);
        let updated = balance.checked_add(delta).ok_or_else(|| {
            LedgerError::Validation(format!(
                "{} balance overflow: {} + {} is out of range",
                currency, balance, delta
            ))
        })?;
        *balance = updated;
        Ok(())
    }
}

impl Add for Balances {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            yer: self.yer + other.yer,
            sar: self.sar + other.sar,
        }
    }
}

/// Error parsing a money amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    Empty,
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "amount is empty"),
            Self::InvalidFormat(s) => write!(f, "invalid amount: '{}'", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("1500").unwrap(), Money::from_units(1500));
        assert_eq!(Money::parse("1,500").unwrap(), Money::from_units(1500));
        assert_eq!(Money::parse("-20").unwrap(), Money::from_units(-20));
        assert_eq!(
            Money::parse("10.25").unwrap().amount(),
            Decimal::new(1025, 2)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse("  "), Err(MoneyParseError::Empty));
        assert!(matches!(
            Money::parse("abc"),
            Err(MoneyParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(1000);
        let b = Money::from_units(300);
        assert_eq!(a + b, Money::from_units(1300));
        assert_eq!(a - b, Money::from_units(700));
        assert_eq!(-b, Money::from_units(-300));
        assert!((b - a).is_negative());
    }

    #[test]
    fn test_decimal_deltas_are_exact() {
        let mut total = Money::zero();
        for _ in 0..10 {
            total += Money::parse("0.1").unwrap();
        }
        assert_eq!(total, Money::from_units(1));
    }

    #[test]
    fn test_balances_apply() {
        let mut balances = Balances::default();
        balances.apply(Currency::Yer, Money::from_units(500)).unwrap();
        balances.apply(Currency::Sar, Money::from_units(-20)).unwrap();
        assert_eq!(balances.get(Currency::Yer), Money::from_units(500));
        assert_eq!(balances.get(Currency::Sar), Money::from_units(-20));
    }

    #[test]
    fn test_balances_apply_overflow_is_an_error() {
        let huge = Money::parse("79228162514264337593543950335").unwrap();
        let mut balances = Balances::new(Money::from_units(1), Money::zero());

        let err = balances.apply(Currency::Yer, huge).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(balances.get(Currency::Yer), Money::from_units(1));

        balances.apply(Currency::Sar, -huge).unwrap();
        assert!(balances.apply(Currency::Sar, -Money::from_units(1)).is_err());
    }

    #[test]
    fn test_operators_saturate() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max + Money::from_units(1), max);
        assert_eq!(-max - Money::from_units(1), -max);
        assert_eq!(max.checked_add(Money::from_units(1)), None);
        assert_eq!([max, max].iter().sum::<Money>(), max);
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::parse("yer"), Some(Currency::Yer));
        assert_eq!(Currency::parse("SAR"), Some(Currency::Sar));
        assert_eq!(Currency::parse("USD"), None);
        assert_eq!(serde_json::to_string(&Currency::Sar).unwrap(), "\"SAR\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::parse("1500.50").unwrap().to_string(), "1500.5");
        assert_eq!(Money::from_units(300).to_string(), "300");
    }
}
