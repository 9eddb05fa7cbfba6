//! In-memory stores for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stockline_core::{OrderId, ProductId};
use stockline_inventory::Product;
use stockline_sales::Order;

use super::{OrderStore, ProductStore, StoreError};

/// Product rows behind an async RwLock; updates are per-row atomic because
/// the whole map is written under the write lock.
#[derive(Default)]
pub struct InMemoryProductStore {
    rows: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let mut all: Vec<Product> = self.rows.read().await.values().cloned().collect();
        all.sort_by_key(|p| (p.created_at, *p.id.as_uuid()));
        Ok(all)
    }

    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        self.rows.write().await.insert(product.id, product);
        Ok(())
    }

    async fn update(&self, product: Product) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&product.id) {
            Some(row) => {
                *row = product;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    rows: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let mut all: Vec<Order> = self.rows.read().await.values().cloned().collect();
        all.sort_by_key(|o| (o.created_at, *o.id.as_uuid()));
        Ok(all)
    }

    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        self.rows.write().await.insert(order.id, order);
        Ok(())
    }
}
