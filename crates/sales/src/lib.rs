//! Sales domain module.
//!
//! This crate contains business rules for the order-taking side, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! order-acceptance orchestration that talks to the network lives in
//! `stockline-infra`; this crate defines the `Order` aggregate, the read-only
//! `StockSnapshot` the sales side sees of inventory, and the `StockQuery`
//! port that orchestration depends on.

pub mod order;
pub mod request;
pub mod snapshot;
pub mod stock;

pub use order::{Order, OrderItem, OrderStatus};
pub use request::{RequestedItem, RequestError, validate_request};
pub use snapshot::StockSnapshot;
pub use stock::{StockQuery, StockQueryError};
