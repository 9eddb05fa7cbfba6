use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockline_core::DomainError;
use stockline_infra::{PlaceOrderError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store_error",
        err.to_string(),
    )
}

pub fn place_order_error_to_response(err: PlaceOrderError) -> axum::response::Response {
    match &err {
        PlaceOrderError::EmptyOrder | PlaceOrderError::InvalidQuantity(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_order", err.to_string())
        }
        PlaceOrderError::ProductNotFound(_) => {
            json_error(StatusCode::BAD_REQUEST, "unknown_product", err.to_string())
        }
        PlaceOrderError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", err.to_string())
        }
        PlaceOrderError::UpstreamUnavailable(_) => {
            json_error(StatusCode::BAD_GATEWAY, "stock_unavailable", err.to_string())
        }
        PlaceOrderError::Store(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}
