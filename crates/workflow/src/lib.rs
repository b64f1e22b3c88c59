//! Order placement for the point-of-sale service.
//!
//! [`OrderWorkflow`] validates a requested quantity against live stock,
//! persists the order with its total, and decrements stock through the
//! store's conditional update:
//! 1. Validate quantity against a fresh item read
//! 2. Compute the total from the price snapshot
//! 3. Persist the order as `Pending`
//! 4. Adjust stock, retrying on conflict with a re-read
//!
//! A failure after step 3 never removes the order. It is marked
//! `StockAdjustmentFailed` and reported as a partial failure.
//!
//! [`StockIntake`] adds new items or restocks existing ones by name.

pub mod error;
pub mod intake;
pub mod policy;
pub mod state;
pub mod workflow;

pub use error::{PartialFailureReason, WorkflowError};
pub use intake::{IntakeOutcome, ItemIntake, StockIntake};
pub use policy::RetryPolicy;
pub use state::WorkflowStep;
pub use workflow::{OrderWorkflow, PlaceOrder, PlacedOrder, Quote};
