use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockline_core::ProductId;

/// One line of an incoming order request: which product, how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Deterministic rejection of a request before any network call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("order has no items")]
    Empty,

    #[error("quantity must be positive for product {0}")]
    ZeroQuantity(ProductId),
}

/// Precondition check for `PlaceOrder`: non-empty, every quantity > 0.
pub fn validate_request(items: &[RequestedItem]) -> Result<(), RequestError> {
    if items.is_empty() {
        return Err(RequestError::Empty);
    }
    for item in items {
        if item.quantity == 0 {
            return Err(RequestError::ZeroQuantity(item.product_id));
        }
    }
    Ok(())
}
