//! Precision-safe decimal newtypes for surveillance math.
//!
//! Uses `rust_decimal` for exact decimal arithmetic: trade sizes, prices,
//! and USD notionals must never drift the way floating point would.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// A probability-scaled price in `[0, 1]`.
///
/// Wraps `Decimal` to keep prices from being mixed with sizes or USD
/// notionals in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Probability(pub Decimal);

impl Probability {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// True when the value lies within the valid `[0, 1]` probability range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Probability {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Probability {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Outcome-token size (6-decimal canonical units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(pub Decimal);

impl TokenAmount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// USD notional of this many tokens at `price`.
    #[inline]
    pub fn notional(&self, price: Probability) -> Usd {
        Usd(self.0 * price.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for TokenAmount {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// A USD-denominated value (trade notional, volume, open interest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usd(pub Decimal);

impl Usd {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self / other` as a plain ratio (e.g. impact percentage), `None` if
    /// `other` is non-positive.
    #[inline]
    pub fn ratio_of(&self, other: Usd) -> Option<Decimal> {
        if other.0 <= Decimal::ZERO {
            return None;
        }
        Some(self.0 / other.0)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl FromStr for Usd {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Usd {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Usd {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Usd {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Usd {
    type Output = Self;
    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Usd {
    type Output = Self;
    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn probability_bounds() {
        assert!(Probability::new(dec!(0.5)).is_valid());
        assert!(Probability::new(dec!(0)).is_valid());
        assert!(Probability::new(dec!(1)).is_valid());
        assert!(!Probability::new(dec!(1.01)).is_valid());
        assert!(!Probability::new(dec!(-0.01)).is_valid());
    }

    #[test]
    fn token_amount_notional() {
        let size = TokenAmount::new(dec!(200000));
        let price = Probability::new(dec!(0.50));
        assert_eq!(size.notional(price), Usd::new(dec!(100000)));
    }

    #[test]
    fn usd_ratio_of_guards_nonpositive_denominator() {
        let usd = Usd::new(dec!(1000));
        assert_eq!(usd.ratio_of(Usd::new(dec!(0))), None);
        assert_eq!(usd.ratio_of(Usd::new(dec!(-5))), None);
        assert_eq!(usd.ratio_of(Usd::new(dec!(500))), Some(dec!(2)));
    }
}
