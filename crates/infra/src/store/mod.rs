//! Durable key-indexed storage for the two sides' aggregates.
//!
//! Each service owns its store exclusively: the inventory service owns the
//! product store, the sales service owns the order store, and neither ever
//! reaches into the other's. The trait surface is deliberately small
//! (get-by-id, list, insert, update) per the storage contract.

use async_trait::async_trait;
use thiserror::Error;

use stockline_core::{OrderId, ProductId};
use stockline_inventory::Product;
use stockline_sales::Order;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryOrderStore, InMemoryProductStore};
pub use postgres::{PgOrderStore, PgProductStore};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or the operation failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("stored data invalid: {0}")]
    Data(String),
}

/// Product records (inventory side).
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn insert(&self, product: Product) -> Result<(), StoreError>;

    /// Whole-row write keyed by `product.id`. Returns `false` when no such
    /// row exists. Per-row atomicity of this write is the only
    /// synchronization the system relies on for product rows.
    async fn update(&self, product: Product) -> Result<bool, StoreError>;
}

/// Order records (sales side). Orders are never mutated after insert in this
/// scope, so there is no update.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    async fn insert(&self, order: Order) -> Result<(), StoreError>;
}
