//! Postgres-backed stores (sqlx).
//!
//! One table per aggregate, whole-row writes keyed by id. Order items are a
//! JSONB column: orders are written and read as a unit, never queried by
//! line, so a child table would buy nothing here.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use stockline_core::{Money, OrderId, ProductId};
use stockline_inventory::Product;
use stockline_sales::{Order, OrderItem, OrderStatus};

use super::{OrderStore, ProductStore, StoreError};

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Data(value.to_string())
            }
            _ => StoreError::Unavailable(value.to_string()),
        }
    }
}

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the products table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id          UUID PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT,
                price       NUMERIC NOT NULL,
                quantity    BIGINT NOT NULL CHECK (quantity >= 0),
                created_at  TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let quantity: i64 = row.try_get("quantity")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::new(row.try_get::<Decimal, _>("price")?),
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Data(format!("quantity out of range: {quantity}")))?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, price, quantity, created_at FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, description, price, quantity, created_at FROM products ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, quantity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(i64::from(product.quantity))
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, product: Product) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, quantity = $5
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(i64::from(product.quantity))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id           UUID PRIMARY KEY,
                created_at   TIMESTAMPTZ NOT NULL,
                status       TEXT NOT NULL,
                items        JSONB NOT NULL,
                total_amount NUMERIC NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Confirmed => "confirmed",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> Result<OrderStatus, StoreError> {
    match s {
        "pending" => Ok(OrderStatus::Pending),
        "confirmed" => Ok(OrderStatus::Confirmed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(StoreError::Data(format!("unknown order status: {other}"))),
    }
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    let items: Json<Vec<OrderItem>> = row.try_get("items")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        created_at: row.try_get("created_at")?,
        status: status_from_str(&status)?,
        items: items.0,
        total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, created_at, status, items, total_amount FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, created_at, status, items, total_amount FROM orders ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, created_at, status, items, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.created_at)
        .bind(status_to_str(order.status))
        .bind(Json(&order.items))
        .bind(order.total_amount.amount())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
