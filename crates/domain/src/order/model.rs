//! Order records.

use chrono::{DateTime, Utc};
use common::{IdempotencyKey, ItemId, OrderId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus};
use crate::item::Item;
use crate::money::Money;
use crate::total::TotalCalculator;

/// A single line of an order.
///
/// Name and price are snapshots taken at order time and never change, even
/// if the catalog entry does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(
        item_id: ItemId,
        item_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            item_id,
            item_name: item_name.into(),
            unit_price,
            quantity,
        }
    }

    /// Captures the item's current name and price for `quantity` units.
    pub fn snapshot(item: &Item, quantity: u32) -> Self {
        Self::new(item.id.clone(), item.name.clone(), item.unit_price, quantity)
    }
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingOrder {
    lines: Vec<OrderLine>,
    total_cost: Money,
    created_at: DateTime<Utc>,
    idempotency_key: IdempotencyKey,
}

impl PendingOrder {
    /// Builds an order from its lines, computing the total once.
    pub fn new(lines: Vec<OrderLine>, idempotency_key: IdempotencyKey) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(OrderError::ZeroQuantity {
                item_id: line.item_id.clone(),
            });
        }
        let total_cost = TotalCalculator::sum(&lines)?;
        Ok(Self {
            lines,
            total_cost,
            created_at: Utc::now(),
            idempotency_key,
        })
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_cost(&self) -> Money {
        self.total_cost
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.idempotency_key
    }

    /// Turns this into a persisted order with the id assigned by the store.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            lines: self.lines,
            total_cost: self.total_cost,
            status: OrderStatus::Pending,
            created_at: self.created_at,
            idempotency_key: self.idempotency_key,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    lines: Vec<OrderLine>,
    total_cost: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    idempotency_key: IdempotencyKey,
}

impl Order {
    /// Rebuilds an order from a stored record.
    pub fn restore(
        id: OrderId,
        lines: Vec<OrderLine>,
        total_cost: Money,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        idempotency_key: IdempotencyKey,
    ) -> Self {
        Self {
            id,
            lines,
            total_cost,
            status,
            created_at,
            idempotency_key,
        }
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_cost(&self) -> Money {
        self.total_cost
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.idempotency_key
    }

    /// Moves the order to `next`, refusing non-monotonic transitions.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: u32) -> OrderLine {
        OrderLine::new(
            ItemId::new("itm1"),
            "rice",
            Money::from_units(price).unwrap(),
            quantity,
        )
    }

    #[test]
    fn test_pending_order_computes_total() {
        let order = PendingOrder::new(vec![line(1000, 3)], IdempotencyKey::new()).unwrap();
        assert_eq!(order.total_cost().units(), 3000);
        assert_eq!(order.lines().len(), 1);
    }

    #[test]
    fn test_pending_order_requires_lines() {
        let result = PendingOrder::new(vec![], IdempotencyKey::new());
        assert!(matches!(result, Err(OrderError::NoLines)));
    }

    #[test]
    fn test_pending_order_rejects_zero_quantity_line() {
        let result = PendingOrder::new(vec![line(1000, 0)], IdempotencyKey::new());
        assert!(matches!(result, Err(OrderError::ZeroQuantity { .. })));
    }

    #[test]
    fn test_snapshot_copies_name_and_price() {
        let mut item = Item {
            id: ItemId::new("itm1"),
            name: "rice".to_string(),
            unit_price: Money::from_units(1000).unwrap(),
            quantity_on_hand: 5,
            description: None,
        };
        let snapshot = OrderLine::snapshot(&item, 2);
        item.unit_price = Money::from_units(9999).unwrap();

        assert_eq!(snapshot.unit_price.units(), 1000);
        assert_eq!(snapshot.item_name, "rice");
    }

    #[test]
    fn test_into_order_starts_pending() {
        let key = IdempotencyKey::new();
        let order = PendingOrder::new(vec![line(500, 2)], key)
            .unwrap()
            .into_order(OrderId::new("ORD-0001"));

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.idempotency_key(), key);
        assert_eq!(order.total_cost().units(), 1000);
    }

    #[test]
    fn test_status_transitions_once() {
        let mut order = PendingOrder::new(vec![line(500, 1)], IdempotencyKey::new())
            .unwrap()
            .into_order(OrderId::new("ORD-0001"));

        order.transition(OrderStatus::Completed).unwrap();
        let err = order
            .transition(OrderStatus::StockAdjustmentFailed)
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InvalidStatusTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::StockAdjustmentFailed
            }
        ));
        assert_eq!(order.status(), OrderStatus::Completed);
    }

    #[test]
    fn test_order_serialization_roundtrip() {
        let order = PendingOrder::new(vec![line(750, 4)], IdempotencyKey::new())
            .unwrap()
            .into_order(OrderId::new("ORD-0002"));
        let json = serde_json::to_string(&order).unwrap();
        let restored: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, restored);
    }
}
