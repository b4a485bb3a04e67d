//! Currency amounts.
//!
//! Amounts are `rust_decimal::Decimal` values normalised to two fractional
//! digits (centavos). Floating point never touches a balance.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of fractional digits kept for every amount.
pub const SCALE: u32 = 2;

/// A currency amount with cent precision.
///
/// Serialized as a decimal string (`"42.50"`); numbers are accepted on input so
/// snapshots written by older versions still load.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Wrap a decimal, rounding half away from zero to cents.
    pub fn new(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(SCALE);
        Self(rounded)
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, SCALE))
    }

    /// Parse operator input such as `"100"`, `"42.5"` or `"42,50"`.
    ///
    /// Only the syntax is checked here; sign rules belong to the operation that
    /// receives the amount.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("amount is required"));
        }

        let normalized = if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
            trimmed.replace(',', ".")
        } else {
            trimmed.to_string()
        };

        let amount = Decimal::from_str(&normalized)
            .map(Self::new)
            .map_err(|_| DomainError::validation(format!("'{trimmed}' is not a valid amount")))?;

        // Magnitudes too large to keep two fractional digits are refused.
        if amount.0.scale() != SCALE {
            return Err(DomainError::validation(format!("'{trimmed}' is out of range")));
        }
        Ok(amount)
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

    pub fn checked_add(self, rhs: Money) -> DomainResult<Money> {
        self.0
            .checked_add(rhs.0)
            .map(Money::new)
            .ok_or_else(|| out_of_range(self, '+', rhs))
    }

    pub fn checked_sub(self, rhs: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(rhs.0)
            .map(Money::new)
            .ok_or_else(|| out_of_range(self, '-', rhs))
    }

    /// Line amount for `quantity` units at this unit price.
    pub fn checked_times(self, quantity: u32) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money::new)
            .ok_or_else(|| {
                DomainError::validation(format!("amount out of range: {self} x {quantity}"))
            })
    }

    /// Sum that reports overflow instead of panicking.
    pub fn checked_sum<I>(amounts: I) -> DomainResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

fn out_of_range(lhs: Money, op: char, rhs: Money) -> DomainError {
    DomainError::validation(format!("amount out of range: {lhs} {op} {rhs}"))
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

// The operators below panic on overflow like `Decimal`'s own; ledger and
// settlement code goes through the `checked_*` methods.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
