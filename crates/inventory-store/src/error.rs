use common::ItemId;
use domain::{OrderError, OrderStatus};
use thiserror::Error;

/// Errors that can occur when talking to the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A record with the same unique key already exists.
    #[error("{kind} already exists: {key}")]
    Duplicate { kind: &'static str, key: String },

    /// A conditional stock update found a different quantity than expected.
    #[error(
        "Stock conflict for item {item_id}: expected quantity {expected}, found {}",
        describe_actual(.actual)
    )]
    Conflict {
        item_id: ItemId,
        expected: u32,
        actual: Option<u32>,
    },

    /// The call did not complete within its time bound.
    #[error("Store call timed out")]
    Timeout,

    /// The request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The backend returned a record that violates a domain invariant.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// An order status update would revert or repeat a transition.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The store refused the call for a transient reason.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

fn describe_actual(actual: &Option<u32>) -> String {
    actual.map_or_else(|| "a newer revision".to_string(), |q| q.to_string())
}

impl StoreError {
    /// Returns true for failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Conflict { .. }
            | StoreError::Timeout
            | StoreError::Transport(_)
            | StoreError::Unavailable(_) => true,
            StoreError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<OrderError> for StoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStatusTransition { from, to } => {
                StoreError::InvalidTransition { from, to }
            }
            other => StoreError::InvalidRecord(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::InvalidRecord(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
