use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockline_core::OrderId;

use crate::app::dto::CreateOrderRequest;
use crate::app::errors;
use crate::app::services::SalesState;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
}

async fn create_order(
    Extension(state): Extension<Arc<SalesState>>,
    Json(body): Json<CreateOrderRequest>,
) -> axum::response::Response {
    match state.placement.place_order(&body.items).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::place_order_error_to_response(e),
    }
}

async fn get_order(
    Extension(state): Extension<Arc<SalesState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match state.orders.get(id).await {
        Ok(Some(order)) => Json(order).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn list_orders(Extension(state): Extension<Arc<SalesState>>) -> axum::response::Response {
    match state.orders.list().await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
