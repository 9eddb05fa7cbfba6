//! Sale channel abstraction (mechanics only).
//!
//! A topic carries raw JSON payloads to every queue bound to it (fan-out, no
//! routing key). Publishing with zero bound queues succeeds; the message is
//! simply seen by no one and is not retained for late binders. Each bound
//! queue delivers at-least-once: a delivery must be explicitly acknowledged,
//! and a delivery dropped without acknowledgement (consumer crash) is
//! redelivered. Multiple consumers of one queue compete for messages.
//!
//! Payloads are bytes, not typed events, on purpose: decoding happens at the
//! consumer, so malformed messages are representable and their handling is
//! testable.

use async_trait::async_trait;
use thiserror::Error;

use crate::sale::SaleEvent;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to encode sale event: {0}")]
    Encode(String),

    /// The channel (or this queue) is closed; no further messages will arrive.
    #[error("channel closed")]
    Closed,

    /// Broker/transport failure.
    #[error("channel transport error: {0}")]
    Transport(String),
}

/// Publishing half of the channel, injected into the acceptance workflow.
#[async_trait]
pub trait SalePublisher: Send + Sync {
    async fn publish(&self, event: &SaleEvent) -> Result<(), ChannelError>;
}

/// Settles a single delivery. Exactly one of `ack`/`nack` is called;
/// implementations decide what happens if neither is (the in-memory topic
/// redelivers, mirroring an un-acked broker delivery).
#[async_trait]
pub trait Acknowledge: Send {
    /// The message was fully processed; remove it from the queue.
    async fn ack(self: Box<Self>) -> Result<(), ChannelError>;

    /// Processing failed; return the message to the queue for redelivery.
    async fn nack(self: Box<Self>) -> Result<(), ChannelError>;
}

/// One received message plus its settlement handle.
pub struct Delivery {
    payload: Vec<u8>,
    acker: Box<dyn Acknowledge>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: Box<dyn Acknowledge>) -> Self {
        Self { payload, acker }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub async fn ack(self) -> Result<(), ChannelError> {
        self.acker.ack().await
    }

    pub async fn nack(self) -> Result<(), ChannelError> {
        self.acker.nack().await
    }
}

impl core::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// A named, durable queue bound to the sale topic.
///
/// `recv` suspends until the next message; idle waiting has no timeout by
/// design (an empty queue is a normal state for a consumer).
#[async_trait]
pub trait SaleQueue: Send + Sync {
    fn name(&self) -> &str;

    async fn recv(&self) -> Result<Delivery, ChannelError>;
}
