//! Router construction for the three HTTP surfaces.
//!
//! - `services.rs`: shared state handed to handlers via `Extension`
//! - `routes/`: handlers, one file per surface
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use stockline_auth::TokenService;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{GatewayState, InventoryState, SalesState};

/// Inventory service router: product CRUD plus the stock endpoints.
///
/// Reads are open (the sales side's stock query must not need a token);
/// writes require auth.
pub fn build_inventory_app(state: InventoryState, tokens: Arc<TokenService>) -> Router {
    let auth_state = middleware::AuthState { tokens };
    let state = Arc::new(state);

    let protected = routes::products::protected_router()
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(
            "/api/products",
            routes::products::open_router().merge(protected),
        )
        .layer(Extension(state))
}

/// Sales service router: order placement and order reads, all auth-gated.
pub fn build_sales_app(state: SalesState, tokens: Arc<TokenService>) -> Router {
    let auth_state = middleware::AuthState { tokens };
    let state = Arc::new(state);

    let protected = routes::orders::router()
        .layer(Extension(state))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/orders", protected)
}

/// Gateway router: token minting plus a pass-through proxy to the two
/// services. The gateway does not validate tokens itself; the services do.
pub fn build_gateway_app(state: GatewayState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::gateway::router())
        .layer(Extension(state))
}
