//! Orders and their status machine.

mod model;
mod status;

pub use model::{Order, OrderLine, PendingOrder};
pub use status::OrderStatus;

use common::ItemId;
use thiserror::Error;

use crate::money::MoneyError;

/// Errors that can occur while building or updating an order.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    /// Order has no lines.
    #[error("Order has no lines")]
    NoLines,

    /// A line was built with a zero quantity.
    #[error("Order line for item {item_id} has zero quantity")]
    ZeroQuantity { item_id: ItemId },

    /// The status change would revert or repeat a transition.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The order total could not be computed.
    #[error("Invalid order total: {0}")]
    Total(#[from] MoneyError),
}
