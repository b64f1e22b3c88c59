//! Order placement, totals and order lookup endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use common::{IdempotencyKey, ItemId, OrderId};
use domain::{Money, Order, parse_quantity};
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};
use workflow::PlaceOrder;

use crate::AppState;
use crate::error::ApiError;

/// Header a client may set to make order placement safe to retry.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub item_id: String,
    #[serde(default)]
    pub quantity: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: String,
    pub status: &'static str,
    pub total: Money,
    pub total_formatted: String,
    pub replayed: bool,
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total: Money,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub item_id: String,
    pub item_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: &'static str,
    pub lines: Vec<OrderLineResponse>,
    pub total: Money,
    pub total_formatted: String,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: String,
}

impl OrderResponse {
    fn from_order(order: &Order, currency: &str) -> Self {
        Self {
            id: order.id().to_string(),
            status: order.status().as_str(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    item_id: line.item_id.to_string(),
                    item_name: line.item_name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                })
                .collect(),
            total: order.total_cost(),
            total_formatted: order.total_cost().format_with(currency),
            created_at: order.created_at(),
            idempotency_key: order.idempotency_key().to_string(),
        }
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, ApiError> {
    match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => Ok(IdempotencyKey::new()),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| IdempotencyKey::parse(v).ok())
            .ok_or_else(|| ApiError::BadRequest("Idempotency-Key must be a UUID".to_string())),
    }
}

/// Quantity for a live total; anything unusable counts as one unit.
fn preview_quantity(input: &str) -> u32 {
    parse_quantity(input)
        .ok()
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1)
}

// -- Handlers --

/// POST /orders — place an order for one item.
///
/// Returns `201` when stock was adjusted and `202` when the order was saved
/// but stock was not adjusted.
#[tracing::instrument(skip(state, headers, form), fields(item_id = %form.item_id))]
pub async fn place<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Form(form): Form<OrderForm>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let key = idempotency_key(&headers)?;
    let quantity = parse_quantity(&form.quantity)?;

    let placed = state
        .workflow
        .place_order(PlaceOrder::new(form.item_id, quantity).with_idempotency_key(key))
        .await?;

    let response = OrderPlacedResponse {
        order_id: placed.order_id.to_string(),
        status: domain::OrderStatus::Completed.as_str(),
        total: placed.total,
        total_formatted: placed.total.format_with(&state.currency),
        replayed: placed.replayed,
    };
    let status = if placed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

/// POST /orders/total — preview the total at the current price.
#[tracing::instrument(skip(state, form), fields(item_id = %form.item_id))]
pub async fn total<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<OrderForm>,
) -> Result<Json<TotalResponse>, ApiError> {
    let item_id = ItemId::new(form.item_id.trim());
    let quote = state
        .workflow
        .quote(&item_id, preview_quantity(&form.quantity))
        .await?;

    Ok(Json(TotalResponse {
        total: quote.total,
        formatted: quote.total.format_with(&state.currency),
    }))
}

/// GET /orders — list orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.list_orders().await?;
    Ok(Json(
        orders
            .iter()
            .map(|order| OrderResponse::from_order(order, &state.currency))
            .collect(),
    ))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .get_order(&OrderId::new(id.clone()))
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::NotFound(format!("Order {id} not found"))
            } else {
                ApiError::Store(e)
            }
        })?;
    Ok(Json(OrderResponse::from_order(&order, &state.currency)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_preview_quantity_falls_back_to_one() {
        assert_eq!(preview_quantity("4"), 4);
        assert_eq!(preview_quantity(""), 1);
        assert_eq!(preview_quantity("0"), 1);
        assert_eq!(preview_quantity("-3"), 1);
        assert_eq!(preview_quantity("lots"), 1);
    }

    #[test]
    fn test_idempotency_key_header() {
        let mut headers = HeaderMap::new();
        assert!(idempotency_key(&headers).is_ok());

        let key = IdempotencyKey::new();
        headers.insert(
            IDEMPOTENCY_KEY_HEADER,
            HeaderValue::from_str(&key.to_string()).unwrap(),
        );
        assert_eq!(idempotency_key(&headers).unwrap(), key);

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("nope"));
        assert!(matches!(
            idempotency_key(&headers),
            Err(ApiError::BadRequest(_))
        ));
    }
}
