use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockline_core::{DomainError, DomainResult, Money, ProductId};

/// Incoming product data (create or whole-row replace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub quantity: u32,
}

/// The inventory record for a product.
///
/// Owned exclusively by the inventory side. `quantity` is non-negative by
/// construction (`u32`); only reconciliation and the direct stock-set
/// operation mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::check_draft(&draft)?;
        Ok(Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            quantity: draft.quantity,
            created_at: now,
        })
    }

    /// Whole-row replace (everything but id and creation time).
    pub fn replace(&mut self, draft: ProductDraft) -> DomainResult<()> {
        Self::check_draft(&draft)?;
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.quantity = draft.quantity;
        Ok(())
    }

    /// Direct stock set (the `PATCH .../stock/{quantity}` operation).
    pub fn set_stock(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    /// Decrement quantity-on-hand for a sale, clamped at zero.
    ///
    /// Returns the number of units actually removed. Overselling upstream
    /// means `requested` can exceed what is on hand; the record never goes
    /// negative.
    pub fn deduct_clamped(&mut self, requested: u32) -> u32 {
        let applied = self.quantity.min(requested);
        self.quantity -= applied;
        applied
    }

    fn check_draft(draft: &ProductDraft) -> DomainResult<()> {
        if draft.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if draft.price.is_negative() {
            return Err(DomainError::validation("price cannot be negative"));
        }
        Ok(())
    }
}
