//! In-memory sale topic for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::channel::{Acknowledge, ChannelError, Delivery, SalePublisher, SaleQueue};
use crate::sale::SaleEvent;

/// The topic holds the receiving end only weakly: the queue handles own it,
/// so a queue with no live handles is observably dead and can be pruned
/// instead of accumulating payloads nobody will read.
struct QueueSlot {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Weak<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

/// In-memory fan-out topic with named queues.
///
/// - Every bound queue receives a copy of every published payload.
/// - Binding the same name twice yields handles to the same queue
///   (competing consumers).
/// - No persistence: payloads published before a queue is bound, or while
///   a queue has no live handles, are not replayed to it.
#[derive(Default)]
pub struct InMemorySaleTopic {
    queues: StdMutex<HashMap<String, QueueSlot>>,
}

impl InMemorySaleTopic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or re-bind) a named queue and return a consumer handle for it.
    ///
    /// If the queue is still alive this joins it; if every previous handle
    /// was dropped, the queue starts over empty.
    pub fn bind_queue(&self, name: impl Into<String>) -> InMemorySaleQueue {
        let name = name.into();
        let mut queues = self.queues.lock().expect("sale topic lock poisoned");

        if let Some(slot) = queues.get(&name) {
            if let Some(rx) = slot.rx.upgrade() {
                return InMemorySaleQueue {
                    name,
                    tx: slot.tx.clone(),
                    rx,
                };
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        queues.insert(
            name.clone(),
            QueueSlot {
                tx: tx.clone(),
                rx: Arc::downgrade(&rx),
            },
        );
        InMemorySaleQueue { name, tx, rx }
    }

    /// Publish raw bytes to every bound queue.
    ///
    /// Zero bound queues is not an error. Queues whose consumer handles are
    /// all gone are pruned while publishing.
    pub fn publish_raw(&self, payload: &[u8]) -> Result<(), ChannelError> {
        let mut queues = self.queues.lock().expect("sale topic lock poisoned");
        queues.retain(|_, slot| {
            slot.rx.strong_count() > 0 && slot.tx.send(payload.to_vec()).is_ok()
        });
        Ok(())
    }
}

#[async_trait]
impl SalePublisher for InMemorySaleTopic {
    async fn publish(&self, event: &SaleEvent) -> Result<(), ChannelError> {
        let payload = event
            .encode()
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        self.publish_raw(&payload)
    }
}

#[async_trait]
impl SalePublisher for Arc<InMemorySaleTopic> {
    async fn publish(&self, event: &SaleEvent) -> Result<(), ChannelError> {
        (**self).publish(event).await
    }
}

/// Consumer handle to one named in-memory queue.
pub struct InMemorySaleQueue {
    name: String,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

#[async_trait]
impl SaleQueue for InMemorySaleQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&self) -> Result<Delivery, ChannelError> {
        let mut rx = self.rx.lock().await;
        let payload = rx.recv().await.ok_or(ChannelError::Closed)?;
        drop(rx);

        let acker = InMemoryAcker {
            payload: Some(payload.clone()),
            requeue: self.tx.clone(),
            settled: false,
        };
        Ok(Delivery::new(payload, Box::new(acker)))
    }
}

/// Redelivers on drop unless the delivery was settled, which is what makes
/// an abandoned delivery behave like an un-acked broker message.
struct InMemoryAcker {
    payload: Option<Vec<u8>>,
    requeue: mpsc::UnboundedSender<Vec<u8>>,
    settled: bool,
}

#[async_trait]
impl Acknowledge for InMemoryAcker {
    async fn ack(mut self: Box<Self>) -> Result<(), ChannelError> {
        self.settled = true;
        Ok(())
    }

    async fn nack(mut self: Box<Self>) -> Result<(), ChannelError> {
        self.settled = true;
        if let Some(payload) = self.payload.take() {
            let _ = self.requeue.send(payload);
        }
        Ok(())
    }
}

impl Drop for InMemoryAcker {
    fn drop(&mut self) {
        if !self.settled {
            if let Some(payload) = self.payload.take() {
                let _ = self.requeue.send(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockline_core::{OrderId, ProductId};

    fn sale(quantity: u32) -> SaleEvent {
        SaleEvent {
            order_id: OrderId::new(),
            items: vec![crate::sale::SaleItem {
                product_id: ProductId::new(),
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn every_bound_queue_receives_a_copy() {
        let topic = InMemorySaleTopic::new();
        let a = topic.bind_queue("inventory.stock");
        let b = topic.bind_queue("audit");

        topic.publish(&sale(2)).await.unwrap();

        let da = a.recv().await.unwrap();
        let db = b.recv().await.unwrap();
        assert_eq!(da.payload(), db.payload());
        da.ack().await.unwrap();
        db.ack().await.unwrap();
    }

    #[tokio::test]
    async fn publishing_with_no_bound_queues_is_not_an_error() {
        let topic = InMemorySaleTopic::new();
        topic.publish(&sale(1)).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_delivery_is_redelivered() {
        let topic = InMemorySaleTopic::new();
        let queue = topic.bind_queue("inventory.stock");
        topic.publish(&sale(5)).await.unwrap();

        let first = queue.recv().await.unwrap();
        let payload = first.payload().to_vec();
        drop(first); // consumer "crashed" before acking

        let second = queue.recv().await.unwrap();
        assert_eq!(second.payload(), payload.as_slice());
        second.ack().await.unwrap();
    }

    #[tokio::test]
    async fn nacked_delivery_is_redelivered() {
        let topic = InMemorySaleTopic::new();
        let queue = topic.bind_queue("inventory.stock");
        topic.publish(&sale(5)).await.unwrap();

        queue.recv().await.unwrap().nack().await.unwrap();
        let redelivered = queue.recv().await.unwrap();
        redelivered.ack().await.unwrap();
    }

    #[tokio::test]
    async fn acked_delivery_is_not_seen_again() {
        let topic = InMemorySaleTopic::new();
        let queue = topic.bind_queue("inventory.stock");
        topic.publish(&sale(1)).await.unwrap();
        topic.publish(&sale(2)).await.unwrap();

        let d1 = queue.recv().await.unwrap();
        let first = SaleEvent::decode(d1.payload()).unwrap();
        d1.ack().await.unwrap();

        let d2 = queue.recv().await.unwrap();
        let second = SaleEvent::decode(d2.payload()).unwrap();
        assert_ne!(first.order_id, second.order_id);
        d2.ack().await.unwrap();
    }

    #[tokio::test]
    async fn same_queue_name_binds_to_competing_consumers() {
        let topic = InMemorySaleTopic::new();
        let a = topic.bind_queue("inventory.stock");
        let _b = topic.bind_queue("inventory.stock");

        topic.publish(&sale(1)).await.unwrap();

        // One copy total for the queue, whichever consumer takes it.
        let d = a.recv().await.unwrap();
        d.ack().await.unwrap();
    }

    #[tokio::test]
    async fn payloads_published_to_a_dead_queue_are_dropped() {
        let topic = InMemorySaleTopic::new();
        let queue = topic.bind_queue("inventory.stock");
        drop(queue);

        // No live handles left, so this publish has nowhere to land.
        let lost = sale(1);
        topic.publish(&lost).await.unwrap();

        let queue = topic.bind_queue("inventory.stock");
        let kept = sale(2);
        topic.publish(&kept).await.unwrap();

        let delivery = queue.recv().await.unwrap();
        let event = SaleEvent::decode(delivery.payload()).unwrap();
        assert_eq!(event.order_id, kept.order_id);
        assert_ne!(event.order_id, lost.order_id);
        delivery.ack().await.unwrap();
    }
}
