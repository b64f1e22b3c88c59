//! Item listing and stock intake endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use domain::{Item, Money};
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};
use workflow::{IntakeOutcome, ItemIntake};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ItemIntakeForm {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub unit_price: Money,
    pub price_formatted: String,
    pub quantity_on_hand: u32,
    pub out_of_stock: bool,
    pub description: Option<String>,
}

impl ItemResponse {
    fn from_item(item: Item, currency: &str) -> Self {
        Self {
            id: item.id.to_string(),
            price_formatted: item.unit_price.format_with(currency),
            out_of_stock: item.is_out_of_stock(),
            name: item.name,
            unit_price: item.unit_price,
            quantity_on_hand: item.quantity_on_hand,
            description: item.description,
        }
    }
}

fn parse_price(input: &str) -> Result<Money, ApiError> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| *p > 0.0)
        .and_then(|p| Money::try_from_f64(p).ok())
        .filter(|m| !m.is_zero())
        .ok_or_else(|| ApiError::BadRequest("Please enter a valid price".to_string()))
}

/// Empty or missing quantity means zero units received.
fn parse_intake_quantity(input: Option<&str>) -> Result<u32, ApiError> {
    match input.map(str::trim).filter(|q| !q.is_empty()) {
        None => Ok(0),
        Some(q) => q
            .parse()
            .map_err(|_| ApiError::BadRequest("Please enter a valid quantity".to_string())),
    }
}

// -- Handlers --

/// GET /items — list all items.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state.store.list_items().await?;
    Ok(Json(
        items
            .into_iter()
            .map(|item| ItemResponse::from_item(item, &state.currency))
            .collect(),
    ))
}

/// POST /items — add a new item or restock an existing one by name.
#[tracing::instrument(skip(state, form), fields(name = %form.name))]
pub async fn receive<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<ItemIntakeForm>,
) -> Result<(StatusCode, Json<IntakeOutcome>), ApiError> {
    let unit_price = parse_price(&form.price)?;
    let quantity = parse_intake_quantity(form.quantity.as_deref())?;

    let outcome = state
        .intake
        .receive(ItemIntake {
            name: form.name,
            unit_price,
            description: form.description,
            quantity,
        })
        .await?;

    let status = match outcome {
        IntakeOutcome::Created { .. } => StatusCode::CREATED,
        IntakeOutcome::Restocked { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
