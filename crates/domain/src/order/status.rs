//! Order status machine.

use serde::{Deserialize, Serialize};

/// Inventory-consistency status of a persisted order.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Completed
///           └──► StockAdjustmentFailed
/// ```
///
/// Both terminal states describe a placed order; they differ only in whether
/// stock was adjusted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order persisted, stock not yet adjusted.
    #[default]
    Pending,

    /// Stock could not be adjusted; needs reconciliation (terminal state).
    StockAdjustmentFailed,

    /// Stock adjusted for the order (terminal state).
    Completed,
}

impl OrderStatus {
    /// Returns true if the order may move from this status to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (
                OrderStatus::Pending,
                OrderStatus::Completed | OrderStatus::StockAdjustmentFailed
            )
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::StockAdjustmentFailed => "StockAdjustmentFailed",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
