use std::sync::Arc;

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{Extension, Request},
    http::StatusCode,
    response::IntoResponse,
    routing::{any, post},
};
use chrono::Duration;
use tracing::warn;

use crate::app::dto::{TokenRequest, TokenResponse};
use crate::app::errors;
use crate::app::services::GatewayState;

const MAX_PROXY_BODY: usize = 1024 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/auth/token", post(issue_token))
        .route("/api/products", any(proxy_inventory))
        .route("/api/products/*path", any(proxy_inventory))
        .route("/api/orders", any(proxy_sales))
        .route("/api/orders/*path", any(proxy_sales))
}

async fn issue_token(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(body): Json<TokenRequest>,
) -> axum::response::Response {
    let subject = body.username.as_deref().unwrap_or("anonymous");
    match state.tokens.issue(subject, Duration::hours(4)) {
        Ok(access_token) => Json(TokenResponse { access_token }).into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "token_error",
            e.to_string(),
        ),
    }
}

async fn proxy_inventory(
    Extension(state): Extension<Arc<GatewayState>>,
    req: Request,
) -> axum::response::Response {
    let base = state.inventory_base_url.clone();
    forward(&state, &base, req).await
}

async fn proxy_sales(
    Extension(state): Extension<Arc<GatewayState>>,
    req: Request,
) -> axum::response::Response {
    let base = state.sales_base_url.clone();
    forward(&state, &base, req).await
}

/// Pass the request through unchanged: method, path, query, body, and the
/// Authorization header. The upstream service does its own token check.
async fn forward(state: &GatewayState, base: &str, req: Request) -> axum::response::Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let url = format!("{base}{path_and_query}");

    let method = req.method().clone();
    let authorization = req.headers().get(axum::http::header::AUTHORIZATION).cloned();
    let content_type = req.headers().get(axum::http::header::CONTENT_TYPE).cloned();

    let body = match to_bytes(req.into_body(), MAX_PROXY_BODY).await {
        Ok(body) => body,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "bad_body", e.to_string());
        }
    };

    let mut upstream = state.client.request(method, &url).body(body);
    if let Some(value) = authorization {
        upstream = upstream.header(axum::http::header::AUTHORIZATION, value);
    }
    if let Some(value) = content_type {
        upstream = upstream.header(axum::http::header::CONTENT_TYPE, value);
    }

    let response = match upstream.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(%url, error = %e, "upstream unreachable");
            return errors::json_error(
                StatusCode::BAD_GATEWAY,
                "upstream_unreachable",
                e.to_string(),
            );
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .cloned();
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_GATEWAY, "upstream_body", e.to_string());
        }
    };

    let mut builder = axum::response::Response::builder().status(status);
    if let Some(value) = content_type {
        builder = builder.header(axum::http::header::CONTENT_TYPE, value);
    }
    match builder.body(axum::body::Body::from(bytes)) {
        Ok(response) => response,
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "proxy_error",
            e.to_string(),
        ),
    }
}
