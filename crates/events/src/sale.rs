use serde::{Deserialize, Serialize};

use stockline_core::{OrderId, ProductId};

/// One sold line: product and the quantity as originally requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Published once per confirmed order.
///
/// Immutable fact; its only identity is the order id it carries. Delivery is
/// at-least-once, so the same event may be observed more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEvent {
    pub order_id: OrderId,
    pub items: Vec<SaleItem>,
}

impl SaleEvent {
    /// JSON wire encoding (`{"orderId": ..., "items": [{"productId", "quantity"}]}`).
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
