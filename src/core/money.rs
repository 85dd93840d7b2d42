//! Fixed-precision monetary amounts.
//!
//! Every stored monetary field is a [`Money`]: a [`Decimal`] rounded half-up
//! (midpoint away from zero) to two decimal places. Intermediate products are
//! plain `Decimal`s and go through [`Money::new`] before they are stored.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest line amount or fixed tax accepted by the calculation (10^15).
///
/// Sums and tax products of amounts below this bound stay well inside the
/// range of [`Decimal`], so the plain operators below cannot overflow on
/// totals that passed the calculation.
pub const MAX_AMOUNT: Money =
    Money(Decimal::from_parts(1_569_325_056, 23_283_064, 0, false, MONEY_SCALE));

/// Round a Decimal to [`MONEY_SCALE`] places using half-up (commercial rounding).
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount, always rounded to two decimal places.
///
/// ```
/// use facturation::core::Money;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(Money::new(dec!(2.675)), Money::new(dec!(2.68)));
/// assert_eq!(Money::new(dec!(300)).to_string(), "300.00");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Round `value` to two places, half-up.
    pub fn new(value: Decimal) -> Self {
        let mut rounded = round(value);
        rounded.rescale(MONEY_SCALE);
        Self(rounded)
    }

    /// Amount from integer minor units (cents).
    pub fn from_minor(minor: i64) -> Self {
        Self::new(Decimal::new(minor, MONEY_SCALE))
    }

    /// Like [`Money::from_minor`], `None` outside the range of `Decimal`.
    pub fn checked_from_minor(minor: i128) -> Option<Self> {
        Decimal::try_from_i128_with_scale(minor, MONEY_SCALE)
            .ok()
            .map(Self::new)
    }

    /// Whole minor units (cents).
    pub fn to_minor(&self) -> Option<i128> {
        self.0.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i128()
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `round(self × quantity)`, `None` on overflow.
    pub fn checked_times(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money::new)
    }

    /// `round(self × percent / 100)`.
    pub fn percent(&self, percent: Decimal) -> Money {
        Money::new(self.0 * percent / Decimal::ONE_HUNDRED)
    }

    /// `round(self × factor)`, `None` on overflow.
    pub fn checked_scale(&self, factor: Decimal) -> Option<Money> {
        self.0.checked_mul(factor).map(Money::new)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money::new)
    }

    /// Within `[0, MAX_AMOUNT]`.
    pub fn is_within_limit(&self) -> bool {
        !self.is_negative() && *self <= MAX_AMOUNT
    }

    /// Clamp negative results to zero.
    pub fn floor_zero(self) -> Money {
        self.max(Money::ZERO)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::new(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::new(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
