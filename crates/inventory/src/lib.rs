//! Inventory domain module.
//!
//! This crate contains business rules for the inventory-of-record side,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). The `Product` here is the authoritative record; the sales side
//! only ever sees read-only snapshots of it.

pub mod product;

pub use product::{Product, ProductDraft};
