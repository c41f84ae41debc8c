//! Money & Quantities

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    iter::Sum,
    ops::Add,
};

use rusty_money::{Money as IsoMoney, iso};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{ValidationError, validate_quantity};

/// Errors raised when building a [`Money`] amount from untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// Amounts are never negative.
    #[error("amount cannot be negative")]
    Negative,
}

/// An amount in minor currency units (cents).
///
/// The store trades in a single currency, so the amount carries no currency
/// of its own; [`Display`] renders it as euros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Creates an amount from a signed minor-unit value, as read from storage
    /// or request payloads.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for values below zero.
    pub fn try_from_minor(minor: i64) -> Result<Self, MoneyError> {
        u64::try_from(minor).map(Self).map_err(|_error| MoneyError::Negative)
    }

    /// Amount in minor units.
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Price of `quantity` units at this unit price. Saturates at `u64::MAX`.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity.get())))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let minor = i64::try_from(self.0).unwrap_or(i64::MAX);

        Display::fmt(&IsoMoney::from_minor(minor, iso::EUR), f)
    }
}

/// A strictly positive number of units: a cart line, an order line, or a
/// stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(1);

    /// Builds a quantity from untrusted input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Quantity`] for values below one or beyond
    /// the supported range.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        validate_quantity(value)?;

        u32::try_from(value)
            .map(Self)
            .map_err(|_error| ValidationError::Quantity)
    }

    /// Number of units.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Adds two quantities, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn negative_amounts_are_rejected() {
        assert_eq!(Money::try_from_minor(-1), Err(MoneyError::Negative));
    }

    #[test]
    fn line_price_multiplies_by_quantity() -> TestResult {
        let price = Money::from_minor(1_500);

        assert_eq!(price.times(Quantity::new(3)?), Money::from_minor(4_500));

        Ok(())
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [100, 250, 5]
            .into_iter()
            .map(Money::from_minor)
            .sum();

        assert_eq!(total.minor(), 355);
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert_eq!(Quantity::new(0), Err(ValidationError::Quantity));
        assert_eq!(Quantity::new(-4), Err(ValidationError::Quantity));
    }

    #[test]
    fn oversized_quantities_are_rejected() {
        assert_eq!(
            Quantity::new(i64::from(u32::MAX) + 1),
            Err(ValidationError::Quantity)
        );
    }
}
