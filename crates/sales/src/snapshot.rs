use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockline_core::{Money, ProductId};

/// Read-only view of a product as the sales side sees it.
///
/// A snapshot is stale the instant it is captured: inventory owns the record
/// and may change it at any time. Nothing on the sales side ever writes one
/// back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub captured_at: DateTime<Utc>,
}

impl StockSnapshot {
    pub fn covers(&self, requested: u32) -> bool {
        self.quantity >= requested
    }
}
