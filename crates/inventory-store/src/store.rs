use async_trait::async_trait;
use common::{ItemId, OrderId};
use domain::{Item, NewItem, Order, OrderStatus, PendingOrder};

use crate::Result;

/// Outcome of an idempotent order creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedOrder {
    /// A new order record was created.
    Created(OrderId),

    /// An order with the same idempotency key already existed.
    Existing(Order),
}

impl CreatedOrder {
    /// Returns the id of the created or existing order.
    pub fn order_id(&self) -> &OrderId {
        match self {
            CreatedOrder::Created(id) => id,
            CreatedOrder::Existing(order) => order.id(),
        }
    }
}

/// Record operations offered by the backing store.
///
/// Each call is an independent remote operation; no two calls are atomic
/// together. [`adjust_stock`](InventoryStore::adjust_stock) is the only
/// concurrency-control point. All implementations must be thread-safe.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Fetches an item by id.
    ///
    /// Fails with `NotFound` if no such item exists.
    async fn get_item_by_id(&self, id: &ItemId) -> Result<Item>;

    /// Fetches the first item whose name matches `normalized_name`.
    ///
    /// Callers pass a name already run through `domain::normalize_name`.
    async fn get_item_by_name(&self, normalized_name: &str) -> Result<Item>;

    /// Lists all items.
    async fn list_items(&self) -> Result<Vec<Item>>;

    /// Creates an item and returns its id.
    async fn create_item(&self, item: NewItem) -> Result<ItemId>;

    /// Sets the item's quantity to `new_quantity` only if it currently
    /// equals `expected_current`.
    ///
    /// Fails with `Conflict` instead of overwriting when another adjustment
    /// happened in between.
    async fn adjust_stock(
        &self,
        id: &ItemId,
        expected_current: u32,
        new_quantity: u32,
    ) -> Result<()>;

    /// Persists an order in `Pending` status.
    ///
    /// Repeating the call with the same idempotency key returns the existing
    /// order rather than creating a duplicate.
    async fn create_order(&self, order: PendingOrder) -> Result<CreatedOrder>;

    /// Fetches an order by id.
    async fn get_order(&self, id: &OrderId) -> Result<Order>;

    /// Lists orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Moves an order to `status`.
    ///
    /// Fails with `InvalidTransition` for non-monotonic changes.
    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<()>;
}
