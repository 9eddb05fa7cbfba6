//! Broker-backed sale channel implementations.
//!
//! The in-memory topic lives in `stockline-events`; this module holds the
//! optional Redis Streams transport for multi-process deployments.

#[cfg(feature = "redis")]
pub mod redis_streams;

#[cfg(feature = "redis")]
pub use redis_streams::{RedisChannelError, RedisSaleChannel, RedisSaleQueue};
