//! Stock reconciliation consumer.
//!
//! Binds a queue to the sale topic and, for each delivered sale event,
//! decrements quantity-on-hand per line, clamped at zero. Settlement policy:
//! ack after the write succeeds; nack on store failure so the delivery comes
//! back; malformed payloads are dead-lettered and acked, since redelivering
//! bytes that can never decode only loops.
//!
//! Delivery is at-least-once, so a redelivered event must not be applied
//! twice. The applied log is keyed per order line (order id, product id),
//! not per event: a store failure part-way through an event nacks the
//! delivery with the already-persisted lines recorded, so the redelivery
//! decrements only the lines that did not make it. On restart the log is
//! empty and an unsettled redelivery may re-apply. That window is accepted
//! here, a durable applied-line log would close it.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use stockline_core::{OrderId, ProductId};
use stockline_events::{ChannelError, Delivery, SaleEvent, SaleQueue};

use crate::store::ProductStore;

/// Sink for payloads that could not be decoded.
///
/// Observable on purpose: tests and operators can see how many messages were
/// discarded and inspect the raw bytes, instead of losing them to a log line.
#[derive(Default)]
pub struct DeadLetters {
    count: AtomicU64,
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl DeadLetters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, payload: &[u8]) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap_or_else(|e| e.into_inner()).push(payload.to_vec());
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Running consumer task plus its shutdown signal.
pub struct ConsumerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signal the loop to stop and wait for it to drain the in-flight
    /// delivery, if any.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

pub struct ReconciliationConsumer {
    products: Arc<dyn ProductStore>,
    queue: Arc<dyn SaleQueue>,
    dead_letters: Arc<DeadLetters>,
}

impl ReconciliationConsumer {
    pub fn new(
        products: Arc<dyn ProductStore>,
        queue: Arc<dyn SaleQueue>,
        dead_letters: Arc<DeadLetters>,
    ) -> Self {
        Self {
            products,
            queue,
            dead_letters,
        }
    }

    /// Start the consume loop on the current runtime.
    pub fn spawn(self) -> ConsumerHandle {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(self.run(signal));
        ConsumerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(queue = self.queue.name(), "reconciliation consumer started");
        let mut applied: HashSet<(OrderId, ProductId)> = HashSet::new();
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                delivery = self.queue.recv() => match delivery {
                    Ok(delivery) => self.process(delivery, &mut applied).await,
                    Err(ChannelError::Closed) => {
                        info!(queue = self.queue.name(), "sale queue closed");
                        break;
                    }
                    Err(error) => {
                        warn!(queue = self.queue.name(), %error, "receive failed; backing off");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }
        info!(queue = self.queue.name(), "reconciliation consumer stopped");
    }

    async fn process(&self, delivery: Delivery, applied: &mut HashSet<(OrderId, ProductId)>) {
        let event = match SaleEvent::decode(delivery.payload()) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "discarding undecodable sale event");
                self.dead_letters.record(delivery.payload());
                settle(delivery.ack().await);
                return;
            }
        };

        for item in &event.items {
            if applied.contains(&(event.order_id, item.product_id)) {
                debug!(
                    order_id = %event.order_id,
                    product_id = %item.product_id,
                    "order line already applied; skipping"
                );
                continue;
            }

            let product = match self.products.get(item.product_id).await {
                Ok(Some(product)) => product,
                Ok(None) => {
                    warn!(
                        order_id = %event.order_id,
                        product_id = %item.product_id,
                        "sale references unknown product; skipping line"
                    );
                    continue;
                }
                Err(error) => {
                    warn!(order_id = %event.order_id, %error, "product store read failed");
                    settle(delivery.nack().await);
                    return;
                }
            };

            let mut product = product;
            let removed = product.deduct_clamped(item.quantity);
            if removed < item.quantity {
                warn!(
                    order_id = %event.order_id,
                    product_id = %item.product_id,
                    requested = item.quantity,
                    removed,
                    "sale exceeded stock on hand; clamped at zero"
                );
            }
            if let Err(error) = self.products.update(product).await {
                warn!(order_id = %event.order_id, %error, "product store write failed");
                settle(delivery.nack().await);
                return;
            }
            applied.insert((event.order_id, item.product_id));
        }

        settle(delivery.ack().await);
    }
}

fn settle(result: Result<(), ChannelError>) {
    if let Err(error) = result {
        warn!(%error, "failed to settle delivery");
    }
}
