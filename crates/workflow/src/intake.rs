//! Receiving stock: new items or restocks of existing ones.

use common::ItemId;
use domain::{Item, Money, NewItem, StockError, normalize_name};
use inventory_store::{InventoryStore, StoreError};
use serde::Serialize;

use crate::error::{Result, WorkflowError};
use crate::policy::RetryPolicy;

/// Stock delivered for an item, identified by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIntake {
    pub name: String,
    pub unit_price: Money,
    pub description: Option<String>,
    pub quantity: u32,
}

/// What an intake did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    /// No item had this name; a new one was created.
    Created { item_id: ItemId },

    /// An item with this name existed; its stock was increased.
    Restocked {
        item_id: ItemId,
        quantity_on_hand: u32,
    },
}

impl IntakeOutcome {
    pub fn item_id(&self) -> &ItemId {
        match self {
            IntakeOutcome::Created { item_id } | IntakeOutcome::Restocked { item_id, .. } => {
                item_id
            }
        }
    }
}

/// Adds items to the catalog or restocks them by normalized name.
///
/// Restocking only changes the quantity; the stored price and description
/// stay as they are. The increase goes through the same conditional update
/// as order placement, so it never overwrites a concurrent sale.
#[derive(Debug, Clone)]
pub struct StockIntake<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S> StockIntake<S>
where
    S: InventoryStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Creates the item or adds `intake.quantity` to its stock.
    #[tracing::instrument(skip(self, intake), fields(name = %intake.name, quantity = intake.quantity))]
    pub async fn receive(&self, intake: ItemIntake) -> Result<IntakeOutcome> {
        if intake.unit_price.is_zero() {
            return Err(WorkflowError::InvalidPrice);
        }
        let name = normalize_name(&intake.name);
        if name.is_empty() {
            return Err(WorkflowError::InvalidName);
        }

        let outcome = match self.policy.call(self.store.get_item_by_name(&name)).await {
            Ok(item) => self.restock(item, intake.quantity).await?,
            Err(e) if e.is_not_found() => {
                let new_item =
                    NewItem::new(&name, intake.unit_price, intake.quantity, intake.description);
                match self.policy.call(self.store.create_item(new_item)).await {
                    Ok(item_id) => {
                        tracing::info!(%item_id, "item created");
                        IntakeOutcome::Created { item_id }
                    }
                    // Created concurrently under the same name
                    Err(StoreError::Duplicate { .. }) => {
                        let item = self
                            .policy
                            .call(self.store.get_item_by_name(&name))
                            .await
                            .map_err(WorkflowError::IntakeFailed)?;
                        self.restock(item, intake.quantity).await?
                    }
                    Err(e) => return Err(WorkflowError::IntakeFailed(e)),
                }
            }
            Err(e) => return Err(WorkflowError::IntakeFailed(e)),
        };

        metrics::counter!("stock_intake_total").increment(1);
        Ok(outcome)
    }

    async fn restock(&self, mut item: Item, quantity: u32) -> Result<IntakeOutcome> {
        // Target of an attempt that failed without saying whether it applied
        let mut unconfirmed: Option<u32> = None;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let new_quantity = item.quantity_on_hand.checked_add(quantity).ok_or(
                StockError::InvalidQuantity {
                    requested: i64::from(quantity),
                },
            )?;

            let err = match self
                .policy
                .call(self.store.adjust_stock(&item.id, item.quantity_on_hand, new_quantity))
                .await
            {
                Ok(()) => {
                    tracing::info!(item_id = %item.id, quantity_on_hand = new_quantity, "item restocked");
                    return Ok(IntakeOutcome::Restocked {
                        item_id: item.id,
                        quantity_on_hand: new_quantity,
                    });
                }
                Err(err) => err,
            };

            if attempt >= self.policy.max_attempts() || !err.is_retryable() {
                return Err(WorkflowError::IntakeFailed(err));
            }
            tracing::warn!(attempt, %err, "restock failed, retrying");
            if err.is_conflict() {
                item = self
                    .policy
                    .call(self.store.get_item_by_id(&item.id))
                    .await
                    .map_err(WorkflowError::IntakeFailed)?;
                if let Some(target) = unconfirmed {
                    if item.quantity_on_hand == target {
                        tracing::warn!(item_id = %item.id, quantity_on_hand = target, "earlier restock was applied");
                        return Ok(IntakeOutcome::Restocked {
                            item_id: item.id,
                            quantity_on_hand: target,
                        });
                    }
                    tracing::warn!(item_id = %item.id, "restock outcome unknown, needs reconciliation");
                    return Err(WorkflowError::IntakeFailed(err));
                }
            } else {
                unconfirmed = Some(new_quantity);
            }
            tokio::time::sleep(self.policy.delay_after(attempt)).await;
        }
    }
}
