//! HTTP API server for the point-of-sale order service.
//!
//! Provides form endpoints for stock intake, order placement and live totals,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use inventory_store::InventoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use workflow::{OrderWorkflow, RetryPolicy, StockIntake};

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub workflow: OrderWorkflow<S>,
    pub intake: StockIntake<S>,
    pub store: S,
    /// Suffix used when formatting totals, e.g. `TZS`.
    pub currency: String,
}

impl<S: InventoryStore + Clone> AppState<S> {
    pub fn new(store: S, policy: RetryPolicy, currency: impl Into<String>) -> Self {
        Self {
            workflow: OrderWorkflow::with_policy(store.clone(), policy),
            intake: StockIntake::with_policy(store.clone(), policy),
            store,
            currency: currency.into(),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/items",
            get(routes::items::list::<S>).post(routes::items::receive::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::place::<S>),
        )
        .route("/orders/total", post(routes::orders::total::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
