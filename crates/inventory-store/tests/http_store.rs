//! Integration tests for the REST adapter against an in-process stub backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use common::{IdempotencyKey, ItemId, OrderId};
use domain::{Money, NewItem, OrderLine, OrderStatus, PendingOrder};
use inventory_store::{
    CreatedOrder, HttpInventoryStore, HttpStoreConfig, InventoryStore, StoreError,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Backend {
    items: Vec<Value>,
    orders: Vec<Value>,
    next_id: u32,
    reject_next_patch: bool,
    patches: u32,
    delay: Option<Duration>,
    auth_headers: Vec<String>,
    idempotency_headers: Vec<String>,
}

type Shared = Arc<Mutex<Backend>>;

impl Backend {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:03}", self.next_id)
    }
}

fn filter_value(params: &HashMap<String, String>, field: &str) -> Option<String> {
    let filter = params.get("filter")?;
    let rest = filter.strip_prefix(&format!("{field}=\""))?;
    Some(rest.strip_suffix('"')?.replace("\\\"", "\""))
}

async fn record_request(state: &Shared, headers: &HeaderMap) {
    let delay = {
        let mut backend = state.lock().unwrap();
        if let Some(auth) = headers.get("authorization") {
            backend
                .auth_headers
                .push(auth.to_str().unwrap().to_string());
        }
        backend.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

async fn list_items(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    record_request(&state, &headers).await;
    let backend = state.lock().unwrap();
    let items: Vec<Value> = match filter_value(&params, "name") {
        Some(name) => backend
            .items
            .iter()
            .filter(|i| i["name"] == name.as_str())
            .cloned()
            .collect(),
        None => backend.items.clone(),
    };
    Json(json!({ "page": 1, "items": items }))
}

async fn create_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Json<Value> {
    record_request(&state, &headers).await;
    let mut backend = state.lock().unwrap();
    let id = backend.next_id("itm");
    body["id"] = json!(id);
    body["updated"] = json!("rev-1");
    backend.items.push(body.clone());
    Json(body)
}

async fn get_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    record_request(&state, &headers).await;
    let backend = state.lock().unwrap();
    match backend.items.iter().find(|i| i["id"] == id.as_str()) {
        Some(item) => (StatusCode::OK, Json(item.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "The requested resource wasn't found." })),
        ),
    }
}

async fn patch_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record_request(&state, &headers).await;
    let mut backend = state.lock().unwrap();
    backend.patches += 1;
    if backend.reject_next_patch {
        backend.reject_next_patch = false;
        return (StatusCode::PRECONDITION_FAILED, Json(json!({})));
    }
    let Some(item) = backend.items.iter_mut().find(|i| i["id"] == id.as_str()) else {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    };
    let revision = item["updated"].as_str().unwrap_or_default().to_string();
    if let Some(if_match) = headers.get("if-match") {
        if if_match.to_str().unwrap().trim_matches('"') != revision {
            return (StatusCode::PRECONDITION_FAILED, Json(json!({})));
        }
    }
    item["quantity"] = body["quantity"].clone();
    let n: u32 = revision
        .trim_start_matches("rev-")
        .parse()
        .unwrap_or_default();
    item["updated"] = json!(format!("rev-{}", n + 1));
    (StatusCode::OK, Json(item.clone()))
}

async fn list_orders(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    record_request(&state, &headers).await;
    let backend = state.lock().unwrap();
    let orders: Vec<Value> = match filter_value(&params, "idempotency_key") {
        Some(key) => backend
            .orders
            .iter()
            .filter(|o| o["idempotency_key"] == key.as_str())
            .cloned()
            .collect(),
        None => backend.orders.iter().rev().cloned().collect(),
    };
    Json(json!({ "page": 1, "items": orders }))
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Json<Value> {
    record_request(&state, &headers).await;
    let mut backend = state.lock().unwrap();
    if let Some(key) = headers.get("idempotency-key") {
        let key = key.to_str().unwrap().to_string();
        backend.idempotency_headers.push(key);
    }
    let id = backend.next_id("ord");
    body["id"] = json!(id);
    backend.orders.push(body.clone());
    Json(body)
}

async fn get_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    record_request(&state, &headers).await;
    let backend = state.lock().unwrap();
    match backend.orders.iter().find(|o| o["id"] == id.as_str()) {
        Some(order) => (StatusCode::OK, Json(order.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn patch_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record_request(&state, &headers).await;
    let mut backend = state.lock().unwrap();
    match backend.orders.iter_mut().find(|o| o["id"] == id.as_str()) {
        Some(order) => {
            order["status"] = body["status"].clone();
            (StatusCode::OK, Json(order.clone()))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn spawn_backend(backend: Backend) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route(
            "/api/collections/items/records",
            get(list_items).post(create_item),
        )
        .route(
            "/api/collections/items/records/{id}",
            get(get_item).patch(patch_item),
        )
        .route(
            "/api/collections/orders/records",
            get(list_orders).post(create_order),
        )
        .route(
            "/api/collections/orders/records/{id}",
            get(get_order).patch(patch_order),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn item_record(id: &str, name: &str, price: i64, quantity: i64) -> Value {
    json!({
        "id": id,
        "collectionName": "items",
        "name": name,
        "price": price,
        "description": "",
        "quantity": quantity,
        "updated": "rev-1"
    })
}

fn store_for(base_url: String) -> HttpInventoryStore {
    HttpInventoryStore::new(HttpStoreConfig {
        base_url,
        ..HttpStoreConfig::default()
    })
    .unwrap()
}

fn money(units: i64) -> Money {
    Money::from_units(units).unwrap()
}

#[tokio::test]
async fn test_get_item_by_id_decodes_record() {
    let (url, _) = spawn_backend(Backend {
        items: vec![item_record("itm1", "rice", 35000, 4)],
        ..Backend::default()
    })
    .await;
    let store = store_for(url);

    let item = store.get_item_by_id(&ItemId::new("itm1")).await.unwrap();
    assert_eq!(item.name, "rice");
    assert_eq!(item.unit_price.units(), 35000);
    assert_eq!(item.quantity_on_hand, 4);
    assert_eq!(item.description, None);
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let (url, _) = spawn_backend(Backend::default()).await;
    let store = store_for(url);

    let err = store.get_item_by_id(&ItemId::new("nope")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_item_by_name_uses_filter() {
    let (url, _) = spawn_backend(Backend {
        items: vec![
            item_record("itm1", "rice", 1000, 4),
            item_record("itm2", "sugar", 2500, 9),
        ],
        ..Backend::default()
    })
    .await;
    let store = store_for(url);

    let item = store.get_item_by_name("sugar").await.unwrap();
    assert_eq!(item.id, ItemId::new("itm2"));

    let err = store.get_item_by_name("salt").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_create_item_then_list() {
    let (url, _) = spawn_backend(Backend::default()).await;
    let store = store_for(url);

    let id = store
        .create_item(NewItem::new(" Maize Flour ", money(2200), 12, None))
        .await
        .unwrap();
    let items = store.list_items().await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id);
    assert_eq!(items[0].name, "maize flour");
    assert_eq!(items[0].quantity_on_hand, 12);
}

#[tokio::test]
async fn test_adjust_stock_succeeds_when_expected_matches() {
    let (url, state) = spawn_backend(Backend {
        items: vec![item_record("itm1", "rice", 1000, 5)],
        ..Backend::default()
    })
    .await;
    let store = store_for(url);
    let id = ItemId::new("itm1");

    store.adjust_stock(&id, 5, 2).await.unwrap();

    assert_eq!(store.get_item_by_id(&id).await.unwrap().quantity_on_hand, 2);
    assert_eq!(state.lock().unwrap().items[0]["updated"], "rev-2");
}

#[tokio::test]
async fn test_adjust_stock_conflicts_on_stale_quantity() {
    let (url, _) = spawn_backend(Backend {
        items: vec![item_record("itm1", "rice", 1000, 3)],
        ..Backend::default()
    })
    .await;
    let store = store_for(url);
    let id = ItemId::new("itm1");

    let err = store.adjust_stock(&id, 5, 2).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict {
            expected: 5,
            actual: Some(3),
            ..
        }
    ));
    assert_eq!(store.get_item_by_id(&id).await.unwrap().quantity_on_hand, 3);
}

#[tokio::test]
async fn test_adjust_stock_reports_precondition_failure_as_conflict() {
    let (url, _) = spawn_backend(Backend {
        items: vec![item_record("itm1", "rice", 1000, 5)],
        reject_next_patch: true,
        ..Backend::default()
    })
    .await;
    let store = store_for(url);

    let err = store
        .adjust_stock(&ItemId::new("itm1"), 5, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { actual: None, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_adjust_stock_refuses_record_without_revision() {
    let mut record = item_record("itm1", "rice", 1000, 5);
    record.as_object_mut().unwrap().remove("updated");
    let (url, state) = spawn_backend(Backend {
        items: vec![record],
        ..Backend::default()
    })
    .await;
    let store = store_for(url);
    let id = ItemId::new("itm1");

    let err = store.adjust_stock(&id, 5, 2).await.unwrap_err();

    assert!(matches!(err, StoreError::InvalidRecord(_)));
    assert!(!err.is_retryable());
    assert_eq!(state.lock().unwrap().patches, 0);
    assert_eq!(store.get_item_by_id(&id).await.unwrap().quantity_on_hand, 5);
}

#[tokio::test]
async fn test_create_order_is_idempotent_by_key() {
    let (url, state) = spawn_backend(Backend::default()).await;
    let store = store_for(url);
    let key = IdempotencyKey::new();
    let order = || {
        PendingOrder::new(
            vec![OrderLine::new(ItemId::new("itm1"), "rice", money(1000), 3)],
            key,
        )
        .unwrap()
    };

    let first = store.create_order(order()).await.unwrap();
    let second = store.create_order(order()).await.unwrap();

    let CreatedOrder::Created(id) = &first else {
        panic!("expected a new order, got {first:?}");
    };
    let CreatedOrder::Existing(existing) = &second else {
        panic!("expected the existing order, got {second:?}");
    };
    assert_eq!(existing.id(), id);
    assert_eq!(existing.total_cost().units(), 3000);
    assert_eq!(existing.status(), OrderStatus::Pending);
    assert_eq!(existing.idempotency_key(), key);

    let backend = state.lock().unwrap();
    assert_eq!(backend.orders.len(), 1);
    assert_eq!(backend.idempotency_headers, vec![key.to_string()]);
}

#[tokio::test]
async fn test_order_status_update_is_monotonic() {
    let (url, _) = spawn_backend(Backend::default()).await;
    let store = store_for(url);
    let pending = PendingOrder::new(
        vec![OrderLine::new(ItemId::new("itm1"), "rice", money(1000), 1)],
        IdempotencyKey::new(),
    )
    .unwrap();
    let created = store.create_order(pending).await.unwrap();
    let id: OrderId = created.order_id().clone();

    store
        .update_order_status(&id, OrderStatus::Completed)
        .await
        .unwrap();
    let err = store
        .update_order_status(&id, OrderStatus::StockAdjustmentFailed)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidTransition { .. }));
    let order = store.get_order(&id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
    assert_eq!(store.list_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (url, _) = spawn_backend(Backend {
        items: vec![item_record("itm1", "rice", 1000, 5)],
        delay: Some(Duration::from_millis(500)),
        ..Backend::default()
    })
    .await;
    let store = HttpInventoryStore::new(HttpStoreConfig {
        base_url: url,
        token: None,
        timeout: Duration::from_millis(50),
    })
    .unwrap();

    let err = store.get_item_by_id(&ItemId::new("itm1")).await.unwrap_err();
    assert!(matches!(err, StoreError::Timeout));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let (url, state) = spawn_backend(Backend {
        items: vec![item_record("itm1", "rice", 1000, 5)],
        ..Backend::default()
    })
    .await;
    let store = HttpInventoryStore::new(HttpStoreConfig {
        base_url: url,
        token: Some("secret-token".to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    store.get_item_by_id(&ItemId::new("itm1")).await.unwrap();

    assert_eq!(
        state.lock().unwrap().auth_headers,
        vec!["Bearer secret-token".to_string()]
    );
}
