//! REST adapter for a PocketBase-style record backend.
//!
//! Items and orders live in two collections under
//! `{base_url}/api/collections/{items|orders}/records`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use common::{IdempotencyKey, ItemId, OrderId};
use domain::{Item, Money, NewItem, Order, OrderLine, OrderStatus, PendingOrder};
use reqwest::header::IF_MATCH;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    Result, StoreError,
    store::{CreatedOrder, InventoryStore},
};

/// Header carrying the idempotency key on order creation.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Connection settings for [`HttpInventoryStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Backend root, e.g. `http://127.0.0.1:8090`.
    pub base_url: String,
    /// Bearer token sent with every request, if any.
    pub token: Option<String>,
    /// Upper bound for each request.
    pub timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

// -- Wire records --

#[derive(Debug, Deserialize)]
struct ItemRecord {
    id: String,
    name: String,
    price: f64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    quantity: i64,
    /// Revision token, sent back as `If-Match` on conditional updates.
    #[serde(default)]
    updated: Option<String>,
}

impl ItemRecord {
    fn quantity_on_hand(&self) -> Result<u32> {
        u32::try_from(self.quantity).map_err(|_| {
            StoreError::InvalidRecord(format!(
                "item {} has invalid quantity {}",
                self.id, self.quantity
            ))
        })
    }

    fn into_item(self) -> Result<Item> {
        let quantity_on_hand = self.quantity_on_hand()?;
        let unit_price = Money::try_from_f64(self.price).map_err(|e| {
            StoreError::InvalidRecord(format!("item {} has invalid price: {e}", self.id))
        })?;
        Ok(Item {
            id: ItemId::new(self.id),
            name: self.name,
            unit_price,
            quantity_on_hand,
            description: self.description.filter(|d| !d.is_empty()),
        })
    }
}

#[derive(Debug, Serialize)]
struct NewItemRecord<'a> {
    name: &'a str,
    price: i64,
    description: &'a str,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

#[derive(Debug, Serialize)]
struct OrderLineOut<'a> {
    item_id: &'a str,
    name: &'a str,
    price: i64,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct OrderLineIn {
    item_id: String,
    name: String,
    price: f64,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct NewOrderRecord<'a> {
    lines: Vec<OrderLineOut<'a>>,
    totalcost: i64,
    status: OrderStatus,
    idempotency_key: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct OrderRecord {
    id: String,
    lines: Vec<OrderLineIn>,
    totalcost: f64,
    status: OrderStatus,
    idempotency_key: String,
    created_at: String,
}

impl OrderRecord {
    fn into_order(self) -> Result<Order> {
        let invalid = |what: String| StoreError::InvalidRecord(format!("order {}: {what}", self.id));

        let lines = self
            .lines
            .iter()
            .map(|line| {
                let price = Money::try_from_f64(line.price)
                    .map_err(|e| invalid(format!("line price: {e}")))?;
                Ok(OrderLine::new(
                    ItemId::new(line.item_id.clone()),
                    line.name.clone(),
                    price,
                    line.quantity,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        if lines.is_empty() {
            return Err(invalid("no lines".to_string()));
        }
        let total_cost =
            Money::try_from_f64(self.totalcost).map_err(|e| invalid(format!("total: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| invalid(format!("created_at: {e}")))?
            .with_timezone(&Utc);
        let idempotency_key = IdempotencyKey::parse(&self.idempotency_key)
            .map_err(|e| invalid(format!("idempotency_key: {e}")))?;

        Ok(Order::restore(
            OrderId::new(self.id),
            lines,
            total_cost,
            self.status,
            created_at,
            idempotency_key,
        ))
    }
}

/// Builds a `field="value"` filter expression with the value quoted.
fn filter_eq(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{field}=\"{escaped}\"")
}

/// Inventory store backed by REST calls to the record backend.
///
/// The backend has no native compare-and-set on a field, so
/// [`adjust_stock`](InventoryStore::adjust_stock) reads the record, checks the
/// expected quantity, and sends the write with `If-Match` set to the record's
/// revision token. A `409` or `412` answer is reported as a conflict.
#[derive(Debug, Clone)]
pub struct HttpInventoryStore {
    client: reqwest::Client,
    config: Arc<HttpStoreConfig>,
}

impl HttpInventoryStore {
    /// Creates a store client with the configured timeout.
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/api/collections/{collection}/records",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn items_url(&self) -> String {
        self.collection_url("items")
    }

    fn orders_url(&self) -> String {
        self.collection_url("orders")
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Sends a request and turns error statuses into [`StoreError`]s.
    async fn send(&self, req: RequestBuilder, kind: &'static str, id: &str) -> Result<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        let message = resp.text().await.unwrap_or_default();
        Err(StoreError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        kind: &'static str,
        id: &str,
    ) -> Result<T> {
        let resp = self.send(req, kind, id).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn fetch_item_record(&self, id: &ItemId) -> Result<ItemRecord> {
        let url = format!("{}/{}", self.items_url(), id);
        self.fetch(self.request(Method::GET, &url), "item", id.as_str())
            .await
    }

    async fn fetch_order_record(&self, id: &OrderId) -> Result<OrderRecord> {
        let url = format!("{}/{}", self.orders_url(), id);
        self.fetch(self.request(Method::GET, &url), "order", id.as_str())
            .await
    }

    async fn find_order_by_key(&self, key: &IdempotencyKey) -> Result<Option<Order>> {
        let key = key.to_string();
        let req = self
            .request(Method::GET, &self.orders_url())
            .query(&[("filter", filter_eq("idempotency_key", &key))]);
        let list: ListResponse<OrderRecord> = self.fetch(req, "order", &key).await?;
        list.items
            .into_iter()
            .next()
            .map(OrderRecord::into_order)
            .transpose()
    }
}

#[async_trait]
impl InventoryStore for HttpInventoryStore {
    async fn get_item_by_id(&self, id: &ItemId) -> Result<Item> {
        tracing::debug!(%id, "fetching item");
        self.fetch_item_record(id).await?.into_item()
    }

    async fn get_item_by_name(&self, normalized_name: &str) -> Result<Item> {
        tracing::debug!(name = normalized_name, "looking up item by name");
        let req = self
            .request(Method::GET, &self.items_url())
            .query(&[("filter", filter_eq("name", normalized_name))]);
        let list: ListResponse<ItemRecord> = self.fetch(req, "item", normalized_name).await?;
        list.items
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: "item",
                id: normalized_name.to_string(),
            })?
            .into_item()
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let req = self
            .request(Method::GET, &self.items_url())
            .query(&[("sort", "name")]);
        let list: ListResponse<ItemRecord> = self.fetch(req, "item", "*").await?;
        list.items.into_iter().map(ItemRecord::into_item).collect()
    }

    async fn create_item(&self, item: NewItem) -> Result<ItemId> {
        let body = NewItemRecord {
            name: item.name(),
            price: item.unit_price.units(),
            description: item.description.as_deref().unwrap_or_default(),
            quantity: item.quantity_on_hand,
        };
        let req = self.request(Method::POST, &self.items_url()).json(&body);
        let created: CreatedRecord = self.fetch(req, "item", item.name()).await?;
        tracing::info!(item_id = %created.id, name = item.name(), "item created");
        Ok(ItemId::new(created.id))
    }

    async fn adjust_stock(
        &self,
        id: &ItemId,
        expected_current: u32,
        new_quantity: u32,
    ) -> Result<()> {
        let record = self.fetch_item_record(id).await?;
        let current = record.quantity_on_hand()?;
        if current != expected_current {
            return Err(StoreError::Conflict {
                item_id: id.clone(),
                expected: expected_current,
                actual: Some(current),
            });
        }

        // Without a revision the PATCH would overwrite concurrent changes
        let Some(revision) = record.updated.as_deref().filter(|r| !r.is_empty()) else {
            tracing::warn!(%id, "item record has no revision, refusing unconditional update");
            return Err(StoreError::InvalidRecord(format!(
                "item {id} has no revision for a conditional update"
            )));
        };

        let url = format!("{}/{}", self.items_url(), id);
        let req = self
            .request(Method::PATCH, &url)
            .header(IF_MATCH, format!("\"{revision}\""))
            .json(&serde_json::json!({ "quantity": new_quantity }));

        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::Conflict {
                item_id: id.clone(),
                expected: expected_current,
                actual: None,
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                kind: "item",
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Backend {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        tracing::debug!(%id, from = current, to = new_quantity, "stock adjusted");
        Ok(())
    }

    async fn create_order(&self, order: PendingOrder) -> Result<CreatedOrder> {
        let key = order.idempotency_key();
        if let Some(existing) = self.find_order_by_key(&key).await? {
            tracing::info!(order_id = %existing.id(), %key, "order already exists for key");
            return Ok(CreatedOrder::Existing(existing));
        }

        let body = NewOrderRecord {
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineOut {
                    item_id: line.item_id.as_str(),
                    name: &line.item_name,
                    price: line.unit_price.units(),
                    quantity: line.quantity,
                })
                .collect(),
            totalcost: order.total_cost().units(),
            status: OrderStatus::Pending,
            idempotency_key: key.to_string(),
            created_at: order
                .created_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let req = self
            .request(Method::POST, &self.orders_url())
            .header(IDEMPOTENCY_KEY_HEADER, key.to_string())
            .json(&body);
        let created: CreatedRecord = self.fetch(req, "order", &key.to_string()).await?;
        Ok(CreatedOrder::Created(OrderId::new(created.id)))
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order> {
        self.fetch_order_record(id).await?.into_order()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let req = self
            .request(Method::GET, &self.orders_url())
            .query(&[("sort", "-created_at")]);
        let list: ListResponse<OrderRecord> = self.fetch(req, "order", "*").await?;
        list.items.into_iter().map(OrderRecord::into_order).collect()
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<()> {
        let current = self.fetch_order_record(id).await?.status;
        if !current.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        let url = format!("{}/{}", self.orders_url(), id);
        let req = self
            .request(Method::PATCH, &url)
            .json(&serde_json::json!({ "status": status }));
        self.send(req, "order", id.as_str()).await?;
        Ok(())
    }
}
