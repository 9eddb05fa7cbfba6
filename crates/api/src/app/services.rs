//! Handler state: the ports each surface needs, wired at startup.

use std::sync::Arc;

use stockline_auth::TokenService;
use stockline_infra::{OrderPlacement, OrderStore, ProductStore};

pub struct InventoryState {
    pub products: Arc<dyn ProductStore>,
}

pub struct SalesState {
    pub placement: OrderPlacement,
    pub orders: Arc<dyn OrderStore>,
}

pub struct GatewayState {
    pub tokens: Arc<TokenService>,
    pub client: reqwest::Client,
    pub inventory_base_url: String,
    pub sales_base_url: String,
}
