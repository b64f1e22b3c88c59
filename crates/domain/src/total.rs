//! Order total computation.

use crate::money::{Money, MoneyError};
use crate::order::OrderLine;

/// Computes order totals from snapshot prices.
pub struct TotalCalculator;

impl TotalCalculator {
    /// Returns `unit_price × quantity`.
    ///
    /// `quantity` is validated by the caller; overflow is the only failure.
    pub fn compute(unit_price: Money, quantity: u32) -> Result<Money, MoneyError> {
        unit_price.multiply(quantity)
    }

    /// Sums the totals of all lines.
    pub fn sum(lines: &[OrderLine]) -> Result<Money, MoneyError> {
        lines.iter().try_fold(Money::zero(), |acc, line| {
            acc.add(Self::compute(line.unit_price, line.quantity)?)
        })
    }
}
