//! Whole-unit money in the store's base currency.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing or combining [`Money`] values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    /// The amount was negative, NaN or infinite.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The result does not fit in the amount's integer range.
    #[error("Amount overflow")]
    Overflow,
}

/// A non-negative amount in whole currency units.
///
/// The base currency has no fractional sub-unit, so the amount is kept as an
/// integer number of units. Floating point only appears at the wire boundary
/// ([`Money::try_from_f64`]) and is rounded there once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money {
    units: i64,
}

impl Money {
    /// Creates an amount from whole units.
    pub fn from_units(units: i64) -> Result<Self, MoneyError> {
        if units < 0 {
            return Err(MoneyError::InvalidAmount(units.to_string()));
        }
        Ok(Self { units })
    }

    /// Creates an amount from a floating point value, rounding half-to-even
    /// to whole units.
    pub fn try_from_f64(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() || value < 0.0 {
            return Err(MoneyError::InvalidAmount(value.to_string()));
        }
        let rounded = value.round_ties_even();
        if rounded >= i64::MAX as f64 {
            return Err(MoneyError::Overflow);
        }
        Ok(Self {
            units: rounded as i64,
        })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { units: 0 }
    }

    /// Returns the amount in whole units.
    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }

    /// Adds another amount.
    pub fn add(&self, other: Money) -> Result<Money, MoneyError> {
        self.units
            .checked_add(other.units)
            .map(|units| Money { units })
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Result<Money, MoneyError> {
        self.units
            .checked_mul(i64::from(quantity))
            .map(|units| Money { units })
            .ok_or(MoneyError::Overflow)
    }

    /// Renders the amount with thousands separators, e.g. `35,000`.
    pub fn grouped(&self) -> String {
        let digits = self.units.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }

    /// Renders the amount followed by a currency label, e.g. `35,000 TZS`.
    pub fn format_with(&self, currency: &str) -> String {
        format!("{} {}", self.grouped(), currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.grouped())
    }
}

impl TryFrom<i64> for Money {
    type Error = MoneyError;

    fn try_from(units: i64) -> Result<Self, Self::Error> {
        Money::from_units(units)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.units
    }
}
