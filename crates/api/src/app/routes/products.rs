use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use chrono::Utc;

use stockline_core::ProductId;
use stockline_inventory::{Product, ProductDraft};

use crate::app::errors;
use crate::app::services::InventoryState;

/// Read endpoints: no auth, this is the stock query surface.
pub fn open_router() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

/// Write endpoints, auth-gated by the caller.
pub fn protected_router() -> Router {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", put(replace_product))
        .route("/:id/stock/:quantity", patch(set_stock))
}

async fn list_products(
    Extension(state): Extension<Arc<InventoryState>>,
) -> axum::response::Response {
    match state.products.list().await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn get_product(
    Extension(state): Extension<Arc<InventoryState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match state.products.get(id).await {
        Ok(Some(product)) => Json(product).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn create_product(
    Extension(state): Extension<Arc<InventoryState>>,
    Json(draft): Json<ProductDraft>,
) -> axum::response::Response {
    let product = match Product::create(ProductId::new(), draft, Utc::now()) {
        Ok(product) => product,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match state.products.insert(product.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn replace_product(
    Extension(state): Extension<Arc<InventoryState>>,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut product = match state.products.get(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = product.replace(draft) {
        return errors::domain_error_to_response(e);
    }

    match state.products.update(product).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn set_stock(
    Extension(state): Extension<Arc<InventoryState>>,
    Path((id, quantity)): Path<(String, u32)>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut product = match state.products.get(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    product.set_stock(quantity);

    match state.products.update(product).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
