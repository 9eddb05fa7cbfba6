//! Order acceptance workflow.
//!
//! `PlaceOrder` is check-then-accept: a synchronous stock check against the
//! inventory side, then local persistence, then a best-effort sale event.
//! The check and the acceptance are not atomic. Two orders can both pass the
//! check against the same units and both be accepted; reconciliation later
//! clamps stock at zero rather than rejecting either order.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use stockline_core::{OrderId, ProductId};
use stockline_events::{SaleEvent, SaleItem, SalePublisher};
use stockline_sales::{
    Order, OrderItem, RequestError, RequestedItem, StockQuery, StockQueryError, validate_request,
};

use crate::store::{OrderStore, StoreError};

/// How a failed availability check is treated.
///
/// `Enforce` rejects the order; `Advisory` logs and accepts anyway, letting
/// reconciliation absorb the shortfall. Enforce is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockCheckMode {
    #[default]
    Enforce,
    Advisory,
}

impl core::str::FromStr for StockCheckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enforce" => Ok(StockCheckMode::Enforce),
            "advisory" => Ok(StockCheckMode::Advisory),
            other => Err(format!("unknown stock check mode: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error("order has no items")]
    EmptyOrder,

    #[error("quantity must be positive for product {0}")]
    InvalidQuantity(ProductId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The stock query upstream could not be reached; the order is neither
    /// accepted nor rejected on its merits.
    #[error("stock query unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("order store error: {0}")]
    Store(String),
}

impl From<RequestError> for PlaceOrderError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::Empty => PlaceOrderError::EmptyOrder,
            RequestError::ZeroQuantity(id) => PlaceOrderError::InvalidQuantity(id),
        }
    }
}

impl From<StockQueryError> for PlaceOrderError {
    fn from(value: StockQueryError) -> Self {
        match value {
            StockQueryError::Unavailable(msg) => PlaceOrderError::UpstreamUnavailable(msg),
        }
    }
}

impl From<StoreError> for PlaceOrderError {
    fn from(value: StoreError) -> Self {
        PlaceOrderError::Store(value.to_string())
    }
}

/// Orchestrates `PlaceOrder` over injected ports: stock query, order store,
/// sale publisher.
pub struct OrderPlacement {
    stock: Arc<dyn StockQuery>,
    orders: Arc<dyn OrderStore>,
    publisher: Arc<dyn SalePublisher>,
    stock_check: StockCheckMode,
}

impl OrderPlacement {
    pub fn new(
        stock: Arc<dyn StockQuery>,
        orders: Arc<dyn OrderStore>,
        publisher: Arc<dyn SalePublisher>,
        stock_check: StockCheckMode,
    ) -> Self {
        Self {
            stock,
            orders,
            publisher,
            stock_check,
        }
    }

    /// Accept or reject an order request.
    ///
    /// Two passes over the stock query. The first validates every line
    /// (existence, availability) and rejects on the first failure without
    /// side effects. The second re-queries to freeze name and unit price
    /// into the order; a product deleted between the passes drops its line
    /// from the persisted order, while the sale event still carries every
    /// requested line.
    pub async fn place_order(&self, requested: &[RequestedItem]) -> Result<Order, PlaceOrderError> {
        validate_request(requested)?;

        for item in requested {
            let snapshot = self
                .stock
                .snapshot(item.product_id)
                .await?
                .ok_or(PlaceOrderError::ProductNotFound(item.product_id))?;
            if !snapshot.covers(item.quantity) {
                match self.stock_check {
                    StockCheckMode::Enforce => {
                        return Err(PlaceOrderError::InsufficientStock {
                            product_id: item.product_id,
                            requested: item.quantity,
                            available: snapshot.quantity,
                        });
                    }
                    StockCheckMode::Advisory => {
                        warn!(
                            product_id = %item.product_id,
                            requested = item.quantity,
                            available = snapshot.quantity,
                            "accepting order past available stock (advisory mode)"
                        );
                    }
                }
            }
        }

        let mut items = Vec::with_capacity(requested.len());
        for item in requested {
            match self.stock.snapshot(item.product_id).await? {
                Some(snapshot) => items.push(OrderItem {
                    product_id: item.product_id,
                    product_name: snapshot.name,
                    unit_price: snapshot.price,
                    quantity: item.quantity,
                }),
                None => {
                    warn!(
                        product_id = %item.product_id,
                        "product vanished between check and materialization; dropping line"
                    );
                }
            }
        }

        let order = Order::confirmed(OrderId::new(), items, Utc::now());
        self.orders.insert(order.clone()).await?;

        let event = SaleEvent {
            order_id: order.id,
            items: requested
                .iter()
                .map(|item| SaleItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        };
        if let Err(error) = self.publisher.publish(&event).await {
            // The order is already durable; a lost event means stock is never
            // reconciled for it, but the caller still gets their order.
            warn!(order_id = %order.id, %error, "failed to publish sale event");
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use stockline_core::Money;
    use stockline_events::ChannelError;
    use stockline_sales::StockSnapshot;

    use crate::store::in_memory::InMemoryOrderStore;

    /// Scripted stock query: each lookup pops the next response for that
    /// product; the last response repeats once the script is exhausted.
    #[derive(Default)]
    struct ScriptedStock {
        responses: Mutex<HashMap<ProductId, Vec<Option<StockSnapshot>>>>,
        calls: AtomicU32,
    }

    impl ScriptedStock {
        fn with(mut self, id: ProductId, script: Vec<Option<StockSnapshot>>) -> Self {
            self.responses.get_mut().unwrap().insert(id, script);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StockQuery for ScriptedStock {
        async fn snapshot(
            &self,
            id: ProductId,
        ) -> Result<Option<StockSnapshot>, StockQueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(&id) {
                Some(script) if script.len() > 1 => Ok(script.remove(0)),
                Some(script) => Ok(script.first().cloned().flatten()),
                None => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<SaleEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl SalePublisher for RecordingPublisher {
        async fn publish(&self, event: &SaleEvent) -> Result<(), ChannelError> {
            if self.fail {
                return Err(ChannelError::Transport("broker down".to_string()));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn snapshot(id: ProductId, name: &str, price: &str, quantity: u32) -> StockSnapshot {
        StockSnapshot {
            id,
            name: name.to_string(),
            price: Money::new(price.parse::<Decimal>().unwrap()),
            quantity,
            captured_at: Utc::now(),
        }
    }

    fn placement(
        stock: ScriptedStock,
        publisher: RecordingPublisher,
        mode: StockCheckMode,
    ) -> (OrderPlacement, Arc<InMemoryOrderStore>, Arc<RecordingPublisher>) {
        let orders = Arc::new(InMemoryOrderStore::new());
        let publisher = Arc::new(publisher);
        let placement = OrderPlacement::new(
            Arc::new(stock),
            orders.clone(),
            publisher.clone(),
            mode,
        );
        (placement, orders, publisher)
    }

    #[tokio::test]
    async fn empty_order_is_rejected_before_any_stock_query() {
        let stock = ScriptedStock::default();
        let calls = Arc::new(stock);
        let (orders, publisher) = (
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(RecordingPublisher::default()),
        );
        let placement = OrderPlacement::new(
            calls.clone(),
            orders,
            publisher,
            StockCheckMode::Enforce,
        );

        let err = placement.place_order(&[]).await.unwrap_err();
        assert!(matches!(err, PlaceOrderError::EmptyOrder));
        assert_eq!(calls.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let id = ProductId::new();
        let (placement, orders, _) = placement(
            ScriptedStock::default(),
            RecordingPublisher::default(),
            StockCheckMode::Enforce,
        );

        let err = placement
            .place_order(&[RequestedItem {
                product_id: id,
                quantity: 1,
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::ProductNotFound(p) if p == id));
        assert!(orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insufficient_stock_is_rejected_in_enforce_mode() {
        let id = ProductId::new();
        let stock = ScriptedStock::default().with(id, vec![Some(snapshot(id, "Widget", "5.00", 2))]);
        let (placement, orders, publisher) =
            placement(stock, RecordingPublisher::default(), StockCheckMode::Enforce);

        let err = placement
            .place_order(&[RequestedItem {
                product_id: id,
                quantity: 3,
            }])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert!(orders.list().await.unwrap().is_empty());
        assert!(publisher.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn advisory_mode_accepts_past_available_stock() {
        let id = ProductId::new();
        let stock = ScriptedStock::default().with(id, vec![Some(snapshot(id, "Widget", "5.00", 2))]);
        let (placement, orders, publisher) =
            placement(stock, RecordingPublisher::default(), StockCheckMode::Advisory);

        let order = placement
            .place_order(&[RequestedItem {
                product_id: id,
                quantity: 3,
            }])
            .await
            .unwrap();
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(orders.list().await.unwrap().len(), 1);
        assert_eq!(publisher.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepted_order_is_persisted_and_published_with_requested_quantities() {
        let a = ProductId::new();
        let b = ProductId::new();
        let stock = ScriptedStock::default()
            .with(a, vec![Some(snapshot(a, "Widget", "10.50", 10))])
            .with(b, vec![Some(snapshot(b, "Gadget", "0.33", 10))]);
        let (placement, orders, publisher) =
            placement(stock, RecordingPublisher::default(), StockCheckMode::Enforce);

        let order = placement
            .place_order(&[
                RequestedItem {
                    product_id: a,
                    quantity: 2,
                },
                RequestedItem {
                    product_id: b,
                    quantity: 3,
                },
            ])
            .await
            .unwrap();

        assert_eq!(
            order.total_amount,
            Money::new(Decimal::new(2199, 2)) // 2 * 10.50 + 3 * 0.33
        );
        assert_eq!(orders.get(order.id).await.unwrap(), Some(order.clone()));

        let events = publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, order.id);
        assert_eq!(
            events[0].items,
            vec![
                SaleItem {
                    product_id: a,
                    quantity: 2
                },
                SaleItem {
                    product_id: b,
                    quantity: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn product_vanishing_between_passes_drops_the_line_but_not_the_event() {
        let a = ProductId::new();
        let b = ProductId::new();
        let stock = ScriptedStock::default()
            .with(a, vec![Some(snapshot(a, "Widget", "1.00", 5))])
            // Present for the check, gone at materialization.
            .with(b, vec![Some(snapshot(b, "Gadget", "2.00", 5)), None])
            ;
        let (placement, _, publisher) =
            placement(stock, RecordingPublisher::default(), StockCheckMode::Enforce);

        let order = placement
            .place_order(&[
                RequestedItem {
                    product_id: a,
                    quantity: 1,
                },
                RequestedItem {
                    product_id: b,
                    quantity: 1,
                },
            ])
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, a);
        assert_eq!(order.total_amount, Money::new(Decimal::new(100, 2)));

        let events = publisher.events.lock().unwrap();
        assert_eq!(events[0].items.len(), 2);
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_order() {
        let id = ProductId::new();
        let stock = ScriptedStock::default().with(id, vec![Some(snapshot(id, "Widget", "5.00", 4))]);
        let failing = RecordingPublisher {
            fail: true,
            ..RecordingPublisher::default()
        };
        let (placement, orders, _) = placement(stock, failing, StockCheckMode::Enforce);

        let order = placement
            .place_order(&[RequestedItem {
                product_id: id,
                quantity: 1,
            }])
            .await
            .unwrap();
        assert_eq!(orders.get(order.id).await.unwrap(), Some(order));
    }
}
