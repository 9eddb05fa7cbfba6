//! Integration events and the pub/sub channel that carries them.
//!
//! The sales side publishes one `SaleEvent` per accepted order; the inventory
//! side consumes them through a bound queue. The channel abstraction here is
//! transport-agnostic and intentionally weak: fan-out to every bound queue,
//! at-least-once delivery per queue, no cross-event ordering. Consumers must
//! tolerate duplicates.

pub mod channel;
pub mod in_memory;
pub mod sale;

pub use channel::{Acknowledge, ChannelError, Delivery, SalePublisher, SaleQueue};
pub use in_memory::{InMemorySaleQueue, InMemorySaleTopic};
pub use sale::{SaleEvent, SaleItem};
