//! Order placement workflow.

use std::time::Instant;

use common::{IdempotencyKey, ItemId, OrderId};
use domain::{
    Item, Money, OrderLine, OrderStatus, PendingOrder, StockValidator, TotalCalculator,
};
use inventory_store::{CreatedOrder, InventoryStore, StoreError};
use serde::Serialize;

use crate::error::{PartialFailureReason, Result, WorkflowError};
use crate::policy::RetryPolicy;
use crate::state::WorkflowStep;

/// Request to place an order for a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub item_id: ItemId,
    /// Raw requested quantity; validated against live stock.
    pub quantity: i64,
    pub idempotency_key: IdempotencyKey,
}

impl PlaceOrder {
    /// Creates a request with a fresh idempotency key.
    pub fn new(item_id: impl Into<ItemId>, quantity: i64) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            idempotency_key: IdempotencyKey::new(),
        }
    }

    /// Uses a caller-supplied idempotency key.
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    /// Stock left after the adjustment, if this call adjusted it.
    pub quantity_on_hand: Option<u32>,
    /// True if the idempotency key matched an order completed earlier.
    pub replayed: bool,
}

/// A live total preview; nothing is checked against stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub item: Item,
    pub quantity: u32,
    pub total: Money,
}

/// Places orders against an [`InventoryStore`].
///
/// The workflow holds no state between calls and may be cloned and shared
/// across tasks. The store's conditional `adjust_stock` is the only
/// concurrency-control point, so concurrent placements never sell more units
/// than were in stock.
#[derive(Debug, Clone)]
pub struct OrderWorkflow<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S> OrderWorkflow<S>
where
    S: InventoryStore + Clone,
{
    /// Creates a workflow with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Places an order for `cmd.quantity` units of `cmd.item_id`.
    ///
    /// Errors before the order is persisted leave nothing behind. Once the
    /// order exists, a failure to adjust stock marks it
    /// `StockAdjustmentFailed` and returns [`WorkflowError::PartialFailure`].
    #[tracing::instrument(
        skip(self, cmd),
        fields(item_id = %cmd.item_id, quantity = cmd.quantity, key = %cmd.idempotency_key)
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<PlacedOrder> {
        metrics::counter!("order_placements_total").increment(1);
        let started = Instant::now();

        let result = self.run(cmd).await;

        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => metrics::counter!("orders_completed_total").increment(1),
            Err(e) if e.is_partial_failure() => {
                metrics::counter!("order_partial_failures_total").increment(1)
            }
            Err(_) => {}
        }
        result
    }

    async fn run(&self, cmd: PlaceOrder) -> Result<PlacedOrder> {
        // 1. Validate against a fresh read
        let mut step = WorkflowStep::Validating;
        tracing::info!(%step, "workflow step started");
        let item = self.lookup_item(&cmd.item_id).await?;
        let quantity = StockValidator::validate(&item, cmd.quantity)?;

        // 2. Snapshot name and price, compute the total once
        step = advance(step, WorkflowStep::Totaling);
        let line = OrderLine::snapshot(&item, quantity);
        let pending = PendingOrder::new(vec![line], cmd.idempotency_key)?;
        let lines = pending.lines().to_vec();
        let total = pending.total_cost();

        // 3. Persist as Pending
        step = advance(step, WorkflowStep::Persisting);
        let created = self
            .policy
            .call(self.store.create_order(pending))
            .await
            .map_err(WorkflowError::OrderPersistenceFailed)?;

        let order_id = match created {
            CreatedOrder::Created(id) => id,
            CreatedOrder::Existing(order) => match order.status() {
                OrderStatus::Completed => {
                    advance(step, WorkflowStep::Completed);
                    tracing::info!(order_id = %order.id(), "order already completed for this key");
                    return Ok(PlacedOrder {
                        order_id: order.id().clone(),
                        lines: order.lines().to_vec(),
                        total: order.total_cost(),
                        quantity_on_hand: None,
                        replayed: true,
                    });
                }
                OrderStatus::StockAdjustmentFailed => {
                    tracing::warn!(order_id = %order.id(), "order already flagged for this key");
                    return Err(WorkflowError::PartialFailure {
                        order_id: order.id().clone(),
                        reason: PartialFailureReason::PreviouslyFlagged,
                    });
                }
                // In flight elsewhere, or its final status was never recorded.
                // Adjusting again could sell the same units twice.
                OrderStatus::Pending => {
                    tracing::warn!(
                        order_id = %order.id(),
                        "order for this key is still pending, needs reconciliation"
                    );
                    return Err(WorkflowError::PartialFailure {
                        order_id: order.id().clone(),
                        reason: PartialFailureReason::AwaitingConfirmation,
                    });
                }
            },
        };

        // 4. Adjust stock with the conditional update
        step = advance(step, WorkflowStep::AdjustingStock);
        match self.adjust_with_retry(&item, quantity).await {
            Ok(remaining) => {
                self.record_status(&order_id, OrderStatus::Completed).await;
                advance(step, WorkflowStep::Completed);
                tracing::info!(%order_id, remaining, "order completed");
                Ok(PlacedOrder {
                    order_id,
                    lines,
                    total,
                    quantity_on_hand: Some(remaining),
                    replayed: false,
                })
            }
            Err(reason) => {
                self.record_status(&order_id, OrderStatus::StockAdjustmentFailed)
                    .await;
                advance(step, WorkflowStep::StockAdjustmentFailed);
                tracing::warn!(%order_id, %reason, "order placed but stock not adjusted");
                Err(WorkflowError::PartialFailure { order_id, reason })
            }
        }
    }

    /// Previews the total for `quantity` units at the item's current price.
    #[tracing::instrument(skip(self))]
    pub async fn quote(&self, item_id: &ItemId, quantity: u32) -> Result<Quote> {
        let item = self.lookup_item(item_id).await?;
        let total = TotalCalculator::compute(item.unit_price, quantity)?;
        Ok(Quote {
            item,
            quantity,
            total,
        })
    }

    async fn lookup_item(&self, id: &ItemId) -> Result<Item> {
        self.policy
            .call(self.store.get_item_by_id(id))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    WorkflowError::ItemNotFound(id.clone())
                } else {
                    WorkflowError::ItemLookupFailed(e)
                }
            })
    }

    /// Decrements stock by `quantity`, starting from the validated snapshot.
    ///
    /// Returns the quantity left on success. Once an attempt has failed
    /// without a conflict it may still have been applied, so a later
    /// conflict is resolved against that attempt's target instead of being
    /// re-validated as a competing sale.
    async fn adjust_with_retry(
        &self,
        item: &Item,
        quantity: u32,
    ) -> std::result::Result<u32, PartialFailureReason> {
        let max_attempts = self.policy.max_attempts();
        let mut expected = item.quantity_on_hand;
        let mut unconfirmed: Option<u32> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;
            // expected always comes from a read that passed validation
            let new_quantity = expected - quantity;

            let err = match self
                .policy
                .call(self.store.adjust_stock(&item.id, expected, new_quantity))
                .await
            {
                Ok(()) => return Ok(new_quantity),
                Err(err) => err,
            };

            let last_error = if err.is_conflict() {
                metrics::counter!("stock_adjustment_conflicts_total").increment(1);
                tracing::info!(attempt, %err, "stock changed since read, re-validating");
                match self.policy.call(self.store.get_item_by_id(&item.id)).await {
                    Ok(fresh) => {
                        if let Some(target) = unconfirmed {
                            return resolve_unconfirmed(&fresh, target, attempt, err);
                        }
                        let accepted = StockValidator::validate(&fresh, i64::from(quantity))
                            .map_err(PartialFailureReason::StockRejected)?;
                        debug_assert_eq!(accepted, quantity);
                        expected = fresh.quantity_on_hand;
                        err
                    }
                    Err(read_err) => {
                        tracing::warn!(attempt, error = %read_err, "re-read after conflict failed");
                        read_err
                    }
                }
            } else {
                tracing::warn!(attempt, %err, "stock adjustment failed");
                unconfirmed = Some(new_quantity);
                err
            };

            if attempt >= max_attempts || !last_error.is_retryable() {
                return Err(PartialFailureReason::RetriesExhausted {
                    attempts: attempt,
                    last_error,
                });
            }
            tokio::time::sleep(self.policy.delay_after(attempt)).await;
        }
    }

    /// Records a terminal order status; a failure is left for reconciliation.
    async fn record_status(&self, order_id: &OrderId, status: OrderStatus) {
        let result: std::result::Result<(), StoreError> = self
            .policy
            .call(self.store.update_order_status(order_id, status))
            .await;
        if let Err(err) = result {
            tracing::warn!(
                %order_id,
                %status,
                error = %err,
                "order status not recorded, needs reconciliation"
            );
        }
    }
}

/// Decides a conflict that followed an attempt with an unknown outcome.
///
/// Stock sitting exactly at that attempt's target is taken as the attempt
/// having landed; anything else is left for reconciliation.
fn resolve_unconfirmed(
    fresh: &Item,
    target: u32,
    attempts: u32,
    last_error: StoreError,
) -> std::result::Result<u32, PartialFailureReason> {
    if fresh.quantity_on_hand == target {
        tracing::warn!(
            item_id = %fresh.id,
            remaining = target,
            "earlier stock adjustment was applied"
        );
        return Ok(target);
    }
    Err(PartialFailureReason::Unconfirmed {
        attempts,
        last_error,
    })
}

fn advance(from: WorkflowStep, to: WorkflowStep) -> WorkflowStep {
    debug_assert!(from.can_advance_to(to), "cannot advance from {from} to {to}");
    tracing::info!(step = %to, "workflow step started");
    to
}
