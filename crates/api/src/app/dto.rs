//! Request/response bodies that are not domain types themselves.
//!
//! Product bodies reuse `ProductDraft` and orders are returned as the
//! `Order` aggregate directly; only the shapes below are HTTP-specific.

use serde::{Deserialize, Serialize};

use stockline_sales::RequestedItem;

/// `POST /api/orders` body: `{"items": [{"productId": ..., "quantity": ...}]}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<RequestedItem>,
}

/// `POST /auth/token` body. Credentials are not checked against anything;
/// the gateway mints a token for whoever asks. Dev-grade on purpose.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}
