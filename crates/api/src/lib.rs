//! HTTP surface: the inventory service, the sales service, and the gateway
//! that fronts both, as three Axum routers sharing one process (or split
//! across processes; nothing here assumes co-location beyond the defaults).

pub mod app;
pub mod config;
pub mod middleware;
