//! Infrastructure layer: stores, HTTP stock client, the order-acceptance
//! workflow, and the stock reconciliation consumer.
//!
//! Domain crates stay pure; everything here composes them with IO behind
//! traits so tests can swap in in-memory implementations.

pub mod channel;
pub mod consumer;
pub mod placement;
pub mod stock_client;
pub mod store;

pub use consumer::{ConsumerHandle, DeadLetters, ReconciliationConsumer};
pub use placement::{OrderPlacement, PlaceOrderError, StockCheckMode};
pub use stock_client::HttpStockQuery;
pub use store::{InMemoryOrderStore, InMemoryProductStore, OrderStore, ProductStore, StoreError};
