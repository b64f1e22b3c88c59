//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::StockError;
use inventory_store::StoreError;
use serde::Serialize;
use workflow::WorkflowError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order placement or intake error.
    Workflow(WorkflowError),
    /// Store error outside the workflow.
    Store(StoreError),
}

/// Body for an order that was saved without adjusting stock.
#[derive(Debug, Serialize)]
pub struct PartialFailureResponse {
    pub order_id: String,
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Workflow(WorkflowError::PartialFailure { order_id, reason }) => {
                let body = PartialFailureResponse {
                    order_id: order_id.to_string(),
                    status: reason.order_status().as_str(),
                    message: format!(
                        "Order saved, but stock could not be updated ({reason}). \
                         It has been flagged for reconciliation."
                    ),
                };
                return (StatusCode::ACCEPTED, Json(body)).into_response();
            }
            ApiError::Workflow(err) => workflow_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, String) {
    match &err {
        WorkflowError::Stock(StockError::InvalidQuantity { .. })
        | WorkflowError::InvalidAmount(_)
        | WorkflowError::InvalidOrder(_)
        | WorkflowError::InvalidPrice
        | WorkflowError::InvalidName => (StatusCode::BAD_REQUEST, err.to_string()),
        WorkflowError::Stock(_) => (StatusCode::CONFLICT, err.to_string()),
        WorkflowError::ItemNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        WorkflowError::ItemLookupFailed(_)
        | WorkflowError::OrderPersistenceFailed(_)
        | WorkflowError::IntakeFailed(_)
        | WorkflowError::PartialFailure { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Duplicate { .. }
        | StoreError::Conflict { .. }
        | StoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        _ => (StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        ApiError::Workflow(WorkflowError::Stock(err))
    }
}
