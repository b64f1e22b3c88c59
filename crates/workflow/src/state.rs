//! Order placement state machine.

use serde::{Deserialize, Serialize};

/// The step an order placement has reached.
///
/// State transitions:
/// ```text
/// Validating ──► Totaling ──► Persisting ──► AdjustingStock ──┬──► Completed
///                                                             └──► StockAdjustmentFailed
/// ```
///
/// Failures before `AdjustingStock` leave nothing behind and have no state of
/// their own; the placement simply ends with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorkflowStep {
    /// Reading the item and checking the requested quantity.
    #[default]
    Validating,

    /// Building the order line and total.
    Totaling,

    /// Creating the order record.
    Persisting,

    /// Decrementing stock with the conditional update.
    AdjustingStock,

    /// Stock adjusted and order marked completed (terminal state).
    Completed,

    /// Order persisted but stock not adjusted (terminal state).
    StockAdjustmentFailed,
}

impl WorkflowStep {
    /// Returns true if the workflow may move from this step to `next`.
    pub fn can_advance_to(&self, next: WorkflowStep) -> bool {
        matches!(
            (self, next),
            (WorkflowStep::Validating, WorkflowStep::Totaling)
                | (WorkflowStep::Totaling, WorkflowStep::Persisting)
                | (WorkflowStep::Persisting, WorkflowStep::AdjustingStock)
                | (WorkflowStep::Persisting, WorkflowStep::Completed)
                | (
                    WorkflowStep::AdjustingStock,
                    WorkflowStep::Completed | WorkflowStep::StockAdjustmentFailed
                )
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStep::Completed | WorkflowStep::StockAdjustmentFailed
        )
    }

    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Validating => "validating",
            WorkflowStep::Totaling => "totaling",
            WorkflowStep::Persisting => "persisting",
            WorkflowStep::AdjustingStock => "adjusting_stock",
            WorkflowStep::Completed => "completed",
            WorkflowStep::StockAdjustmentFailed => "stock_adjustment_failed",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_step_is_validating() {
        assert_eq!(WorkflowStep::default(), WorkflowStep::Validating);
    }

    #[test]
    fn test_forward_path() {
        assert!(WorkflowStep::Validating.can_advance_to(WorkflowStep::Totaling));
        assert!(WorkflowStep::Totaling.can_advance_to(WorkflowStep::Persisting));
        assert!(WorkflowStep::Persisting.can_advance_to(WorkflowStep::AdjustingStock));
        assert!(WorkflowStep::AdjustingStock.can_advance_to(WorkflowStep::Completed));
        assert!(
            WorkflowStep::AdjustingStock.can_advance_to(WorkflowStep::StockAdjustmentFailed)
        );
    }

    #[test]
    fn test_replayed_order_skips_adjustment() {
        assert!(WorkflowStep::Persisting.can_advance_to(WorkflowStep::Completed));
        assert!(!WorkflowStep::Persisting.can_advance_to(WorkflowStep::StockAdjustmentFailed));
    }

    #[test]
    fn test_no_skipping_or_reverting() {
        assert!(!WorkflowStep::Validating.can_advance_to(WorkflowStep::Persisting));
        assert!(!WorkflowStep::Totaling.can_advance_to(WorkflowStep::Validating));
        assert!(!WorkflowStep::Completed.can_advance_to(WorkflowStep::AdjustingStock));
        assert!(!WorkflowStep::StockAdjustmentFailed.can_advance_to(WorkflowStep::Completed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!WorkflowStep::Validating.is_terminal());
        assert!(!WorkflowStep::AdjustingStock.is_terminal());
        assert!(WorkflowStep::Completed.is_terminal());
        assert!(WorkflowStep::StockAdjustmentFailed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkflowStep::AdjustingStock.to_string(), "adjusting_stock");
        assert_eq!(
            WorkflowStep::StockAdjustmentFailed.to_string(),
            "stock_adjustment_failed"
        );
    }
}
