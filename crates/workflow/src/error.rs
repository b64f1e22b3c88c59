//! Workflow error types.

use common::{ItemId, OrderId};
use domain::{MoneyError, OrderError, OrderStatus, StockError};
use inventory_store::StoreError;
use thiserror::Error;

/// Why stock was not adjusted for an order that was already persisted.
#[derive(Debug, Error)]
pub enum PartialFailureReason {
    /// A re-read after a conflict showed too little stock for the request.
    #[error("{0}")]
    StockRejected(StockError),

    /// Every adjustment attempt failed.
    #[error("stock adjustment failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: StoreError },

    /// The order was flagged by an earlier attempt with the same idempotency key.
    #[error("stock was not adjusted when this order was first placed")]
    PreviouslyFlagged,

    /// An earlier attempt with the same idempotency key left the order
    /// pending, so whether its stock was adjusted is unknown.
    #[error("an earlier attempt for this order did not confirm its stock adjustment")]
    AwaitingConfirmation,

    /// An attempt failed without saying whether it was applied, and the
    /// current stock does not show that it was.
    #[error("stock adjustment outcome unknown after {attempts} attempts: {last_error}")]
    Unconfirmed { attempts: u32, last_error: StoreError },
}

impl PartialFailureReason {
    /// Status the order is left in for this reason.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            PartialFailureReason::AwaitingConfirmation => OrderStatus::Pending,
            _ => OrderStatus::StockAdjustmentFailed,
        }
    }
}

/// Errors that can occur while placing an order or receiving stock.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The requested quantity was rejected against current stock.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// No item with this id exists.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The item could not be read.
    #[error("Failed to look up item: {0}")]
    ItemLookupFailed(#[source] StoreError),

    /// The total could not be represented.
    #[error(transparent)]
    InvalidAmount(#[from] MoneyError),

    /// The order could not be built.
    #[error("Invalid order: {0}")]
    InvalidOrder(OrderError),

    /// An intake price was zero.
    #[error("Price must be greater than zero")]
    InvalidPrice,

    /// An intake name was blank.
    #[error("Item name must not be empty")]
    InvalidName,

    /// The order could not be saved; nothing was written.
    #[error("Failed to save order: {0}")]
    OrderPersistenceFailed(#[source] StoreError),

    /// Creating or restocking an item failed.
    #[error("Failed to update inventory: {0}")]
    IntakeFailed(#[source] StoreError),

    /// The order was saved but stock was not adjusted for it.
    #[error("Order {order_id} was placed but stock was not adjusted: {reason}")]
    PartialFailure {
        order_id: OrderId,
        reason: PartialFailureReason,
    },
}

impl WorkflowError {
    /// Returns the persisted order's id for partial failures.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            WorkflowError::PartialFailure { order_id, .. } => Some(order_id),
            _ => None,
        }
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, WorkflowError::PartialFailure { .. })
    }
}

impl From<OrderError> for WorkflowError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Total(money) => WorkflowError::InvalidAmount(money),
            other => WorkflowError::InvalidOrder(other),
        }
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
