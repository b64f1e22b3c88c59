use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use common::{ItemId, OrderId};
use domain::{Item, Money, NewItem, Order, OrderStatus, PendingOrder, normalize_name};

use crate::{
    Result, StoreError,
    store::{CreatedOrder, InventoryStore},
};

#[derive(Debug, Default)]
struct InMemoryStoreState {
    items: BTreeMap<ItemId, Item>,
    orders: Vec<Order>,
    next_item_id: u32,
    next_order_id: u32,
    adjustment_attempts: u32,
    fail_adjustments: u32,
    drop_adjustment_acks: u32,
    fail_order_creates: u32,
    fail_status_updates: u32,
    latency: Option<Duration>,
}

impl InMemoryStoreState {
    fn insert_item(&mut self, item: NewItem) -> Result<ItemId> {
        if self.items.values().any(|i| i.name == item.name()) {
            return Err(StoreError::Duplicate {
                kind: "item",
                key: item.name().to_string(),
            });
        }
        self.next_item_id += 1;
        let id = ItemId::new(format!("ITM-{:04}", self.next_item_id));
        self.items.insert(
            id.clone(),
            Item {
                id: id.clone(),
                name: item.name().to_string(),
                unit_price: item.unit_price,
                quantity_on_hand: item.quantity_on_hand,
                description: item.description,
            },
        );
        Ok(id)
    }
}

/// Consumes one unit of an injected failure budget.
fn take_failure(budget: &mut u32) -> bool {
    if *budget > 0 {
        *budget -= 1;
        true
    } else {
        false
    }
}

/// In-memory inventory store.
///
/// Behaves like the REST backend with an exact conditional stock update and
/// idempotent order creation, plus knobs for injecting failures and latency.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryStoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryStoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        let latency = self.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Adds an item directly and returns its id.
    pub fn seed_item(&self, name: &str, unit_price: Money, quantity_on_hand: u32) -> ItemId {
        let mut state = self.write();
        let item = NewItem::new(name, unit_price, quantity_on_hand, None);
        match state.insert_item(item) {
            Ok(id) => id,
            Err(_) => state
                .items
                .values()
                .find(|i| i.name == normalize_name(name))
                .map(|i| i.id.clone())
                .unwrap_or_else(|| ItemId::new(normalize_name(name))),
        }
    }

    /// Changes an item's catalog price.
    pub fn set_unit_price(&self, id: &ItemId, unit_price: Money) -> bool {
        match self.write().items.get_mut(id) {
            Some(item) => {
                item.unit_price = unit_price;
                true
            }
            None => false,
        }
    }

    /// Returns the current quantity of an item.
    pub fn quantity_on_hand(&self, id: &ItemId) -> Option<u32> {
        self.read().items.get(id).map(|i| i.quantity_on_hand)
    }

    /// Returns the number of stored orders.
    pub fn order_count(&self) -> usize {
        self.read().orders.len()
    }

    /// Returns the number of `adjust_stock` calls received.
    pub fn adjustment_attempts(&self) -> u32 {
        self.read().adjustment_attempts
    }

    /// Makes the next `n` stock adjustments fail as unavailable.
    pub fn fail_next_adjustments(&self, n: u32) {
        self.write().fail_adjustments = n;
    }

    /// Makes the next `n` successful stock adjustments report a timeout.
    ///
    /// The new quantity is still written, like a backend that applied the
    /// update before the response was lost.
    pub fn drop_next_adjustment_acks(&self, n: u32) {
        self.write().drop_adjustment_acks = n;
    }

    /// Makes the next `n` order creations fail as unavailable.
    pub fn fail_next_order_creates(&self, n: u32) {
        self.write().fail_order_creates = n;
    }

    /// Makes the next `n` order status updates fail as unavailable.
    pub fn fail_next_status_updates(&self, n: u32) {
        self.write().fail_status_updates = n;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.write().latency = latency;
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_item_by_id(&self, id: &ItemId) -> Result<Item> {
        self.simulate_latency().await;
        self.read()
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "item",
                id: id.to_string(),
            })
    }

    async fn get_item_by_name(&self, normalized_name: &str) -> Result<Item> {
        self.simulate_latency().await;
        let wanted = normalize_name(normalized_name);
        self.read()
            .items
            .values()
            .find(|i| normalize_name(&i.name) == wanted)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: "item",
                id: wanted,
            })
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        self.simulate_latency().await;
        let mut items: Vec<Item> = self.read().items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn create_item(&self, item: NewItem) -> Result<ItemId> {
        self.simulate_latency().await;
        self.write().insert_item(item)
    }

    async fn adjust_stock(
        &self,
        id: &ItemId,
        expected_current: u32,
        new_quantity: u32,
    ) -> Result<()> {
        self.simulate_latency().await;
        let mut state = self.write();
        state.adjustment_attempts += 1;

        if take_failure(&mut state.fail_adjustments) {
            return Err(StoreError::Unavailable(
                "injected stock adjustment failure".to_string(),
            ));
        }

        let item = state.items.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "item",
            id: id.to_string(),
        })?;

        if item.quantity_on_hand != expected_current {
            return Err(StoreError::Conflict {
                item_id: id.clone(),
                expected: expected_current,
                actual: Some(item.quantity_on_hand),
            });
        }

        item.quantity_on_hand = new_quantity;
        if take_failure(&mut state.drop_adjustment_acks) {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }

    async fn create_order(&self, order: PendingOrder) -> Result<CreatedOrder> {
        self.simulate_latency().await;
        let mut state = self.write();

        if take_failure(&mut state.fail_order_creates) {
            return Err(StoreError::Unavailable(
                "injected order creation failure".to_string(),
            ));
        }

        let key = order.idempotency_key();
        if let Some(existing) = state.orders.iter().find(|o| o.idempotency_key() == key) {
            return Ok(CreatedOrder::Existing(existing.clone()));
        }

        state.next_order_id += 1;
        let id = OrderId::new(format!("ORD-{:04}", state.next_order_id));
        state.orders.push(order.into_order(id.clone()));
        Ok(CreatedOrder::Created(id))
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order> {
        self.simulate_latency().await;
        self.read()
            .orders
            .iter()
            .find(|o| o.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "order",
                id: id.to_string(),
            })
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.simulate_latency().await;
        Ok(self.read().orders.iter().rev().cloned().collect())
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<()> {
        self.simulate_latency().await;
        let mut state = self.write();

        if take_failure(&mut state.fail_status_updates) {
            return Err(StoreError::Unavailable(
                "injected status update failure".to_string(),
            ));
        }

        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "order",
                id: id.to_string(),
            })?;
        order.transition(status)?;
        Ok(())
    }
}
