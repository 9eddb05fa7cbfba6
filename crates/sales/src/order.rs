use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockline_core::{Money, OrderId, ProductId};

/// Order status lifecycle.
///
/// Orders in this scope are created directly as `Confirmed`; `Pending` and
/// `Cancelled` exist on the wire for forward compatibility with flows that
/// are out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A single order line.
///
/// Name and unit price are copied from the stock snapshot at order time; they
/// are frozen values, not live references into inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// An accepted order.
///
/// Created all-at-once by the acceptance workflow and never mutated after
/// confirmation. `total_amount` always equals the sum of line totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
}

impl Order {
    /// Materialize a confirmed order from its frozen items.
    ///
    /// The total is derived here and nowhere else, which is what keeps the
    /// total/line-sum invariant trivially true.
    pub fn confirmed(id: OrderId, items: Vec<OrderItem>, now: DateTime<Utc>) -> Self {
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        Self {
            id,
            created_at: now,
            status: OrderStatus::Confirmed,
            items,
            total_amount,
        }
    }

    pub fn total_matches_items(&self) -> bool {
        self.total_amount == self.items.iter().map(OrderItem::line_total).sum()
    }
}
