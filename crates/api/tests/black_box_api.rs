//! End-to-end tests over real HTTP: all three surfaces on ephemeral ports,
//! in-memory stores, the real consumer on the real channel.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use stockline_api::app;
use stockline_api::app::services::{GatewayState, InventoryState, SalesState};
use stockline_auth::TokenService;
use stockline_events::{InMemorySaleQueue, InMemorySaleTopic, SalePublisher};
use stockline_infra::{
    DeadLetters, HttpStockQuery, InMemoryOrderStore, InMemoryProductStore, OrderPlacement,
    ReconciliationConsumer, StockCheckMode,
    consumer::ConsumerHandle,
};

const JWT_SECRET: &str = "test-secret";

struct TestSystem {
    gateway_url: String,
    inventory_url: String,
    sales_url: String,
    products: Arc<InMemoryProductStore>,
    topic: Arc<InMemorySaleTopic>,
    queue: Option<Arc<InMemorySaleQueue>>,
    dead_letters: Arc<DeadLetters>,
    consumer: Option<ConsumerHandle>,
    servers: Vec<tokio::task::JoinHandle<()>>,
}

impl TestSystem {
    /// Everything running, consumer included.
    async fn spawn() -> Self {
        let mut system = Self::spawn_without_consumer().await;
        system.start_consumer();
        system
    }

    /// Servers up, queue bound, but no consumer draining it yet. Lets tests
    /// control exactly when reconciliation happens.
    async fn spawn_without_consumer() -> Self {
        let tokens = Arc::new(TokenService::new(
            JWT_SECRET.as_bytes(),
            "stockline-gateway",
            "stockline-services",
        ));

        let products = Arc::new(InMemoryProductStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let topic = Arc::new(InMemorySaleTopic::new());
        // Bind before anything publishes; the topic has no retention.
        let queue = Arc::new(topic.bind_queue("inventory.stock"));
        let dead_letters = Arc::new(DeadLetters::new());

        let mut servers = Vec::new();

        let inventory_app = app::build_inventory_app(
            InventoryState {
                products: products.clone(),
            },
            tokens.clone(),
        );
        let (inventory_url, handle) = serve(inventory_app).await;
        servers.push(handle);

        let stock = HttpStockQuery::new(inventory_url.clone(), Duration::from_secs(2))
            .expect("stock client");
        let publisher: Arc<dyn SalePublisher> = topic.clone();
        let placement = OrderPlacement::new(
            Arc::new(stock),
            orders.clone(),
            publisher,
            StockCheckMode::Enforce,
        );
        let sales_app = app::build_sales_app(
            SalesState {
                placement,
                orders: orders.clone(),
            },
            tokens.clone(),
        );
        let (sales_url, handle) = serve(sales_app).await;
        servers.push(handle);

        let gateway_app = app::build_gateway_app(GatewayState {
            tokens,
            client: reqwest::Client::new(),
            inventory_base_url: inventory_url.clone(),
            sales_base_url: sales_url.clone(),
        });
        let (gateway_url, handle) = serve(gateway_app).await;
        servers.push(handle);

        Self {
            gateway_url,
            inventory_url,
            sales_url,
            products,
            topic,
            queue: Some(queue),
            dead_letters,
            consumer: None,
            servers,
        }
    }

    fn start_consumer(&mut self) {
        let queue = self.queue.take().expect("consumer already started");
        self.consumer = Some(
            ReconciliationConsumer::new(self.products.clone(), queue, self.dead_letters.clone())
                .spawn(),
        );
    }
}

impl Drop for TestSystem {
    fn drop(&mut self) {
        for handle in &self.servers {
            handle.abort();
        }
    }
}

async fn serve(app: axum::Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

async fn fetch_token(client: &reqwest::Client, gateway_url: &str) -> String {
    let res = client
        .post(format!("{gateway_url}/auth/token"))
        .json(&json!({ "username": "tester" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_product(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    name: &str,
    price: f64,
    quantity: u32,
) -> String {
    let res = client
        .post(format!("{base_url}/api/products"))
        .bearer_auth(token)
        .json(&json!({ "name": name, "price": price, "quantity": quantity }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn quantity_of(client: &reqwest::Client, inventory_url: &str, id: &str) -> u32 {
    let res = client
        .get(format!("{inventory_url}/api/products/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["quantity"].as_u64().unwrap() as u32
}

/// Reconciliation is asynchronous; poll until the stock level converges.
async fn wait_for_quantity(client: &reqwest::Client, inventory_url: &str, id: &str, expected: u32) {
    for _ in 0..200 {
        if quantity_of(client, inventory_url, id).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "stock never reached {expected}, still {}",
        quantity_of(client, inventory_url, id).await
    );
}

#[tokio::test]
async fn writes_require_a_valid_token() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/products", sys.inventory_url))
        .json(&json!({ "name": "Widget", "price": 1.0, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/api/orders", sys.sales_url))
        .bearer_auth("not-a-real-token")
        .json(&json!({ "items": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_reads_are_open() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/products", sys.inventory_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn accepted_order_eventually_decrements_stock() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();
    let token = fetch_token(&client, &sys.gateway_url).await;

    let id = create_product(&client, &sys.gateway_url, &token, "Widget", 10.50, 10).await;

    let res = client
        .post(format!("{}/api/orders", sys.gateway_url))
        .bearer_auth(&token)
        .json(&json!({ "items": [{ "productId": id, "quantity": 3 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: serde_json::Value = res.json().await.unwrap();
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["totalAmount"].as_f64().unwrap(), 31.5);
    assert_eq!(order["items"][0]["productName"], "Widget");

    wait_for_quantity(&client, &sys.inventory_url, &id, 7).await;

    // The accepted order is retrievable afterwards.
    let order_id = order["id"].as_str().unwrap();
    let res = client
        .get(format!("{}/api/orders/{order_id}", sys.sales_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn order_past_available_stock_is_rejected() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();
    let token = fetch_token(&client, &sys.gateway_url).await;

    let id = create_product(&client, &sys.gateway_url, &token, "Widget", 5.0, 2).await;

    let res = client
        .post(format!("{}/api/orders", sys.sales_url))
        .bearer_auth(&token)
        .json(&json!({ "items": [{ "productId": id, "quantity": 3 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    // Rejection has no side effects.
    assert_eq!(quantity_of(&client, &sys.inventory_url, &id).await, 2);
}

#[tokio::test]
async fn unknown_product_and_empty_order_are_rejected() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();
    let token = fetch_token(&client, &sys.gateway_url).await;

    let res = client
        .post(format!("{}/api/orders", sys.sales_url))
        .bearer_auth(&token)
        .json(&json!({ "items": [{ "productId": uuid::Uuid::now_v7(), "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_product");

    let res = client
        .post(format!("{}/api/orders", sys.sales_url))
        .bearer_auth(&token)
        .json(&json!({ "items": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_order");
}

#[tokio::test]
async fn concurrent_acceptance_oversell_clamps_stock_at_zero() {
    // Consumer held back so both orders pass the stock check against the
    // same unreconciled quantity.
    let mut sys = TestSystem::spawn_without_consumer().await;
    let client = reqwest::Client::new();
    let token = fetch_token(&client, &sys.gateway_url).await;

    let id = create_product(&client, &sys.gateway_url, &token, "Widget", 1.0, 5).await;

    for quantity in [4, 3] {
        let res = client
            .post(format!("{}/api/orders", sys.sales_url))
            .bearer_auth(&token)
            .json(&json!({ "items": [{ "productId": id, "quantity": quantity }] }))
            .send()
            .await
            .unwrap();
        // Both accepted: each check saw quantity 5.
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    sys.start_consumer();
    wait_for_quantity(&client, &sys.inventory_url, &id, 0).await;
}

#[tokio::test]
async fn malformed_event_is_dead_lettered_without_stalling_reconciliation() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();
    let token = fetch_token(&client, &sys.gateway_url).await;

    let id = create_product(&client, &sys.gateway_url, &token, "Widget", 2.0, 6).await;

    sys.topic.publish_raw(b"this is not a sale event").unwrap();

    let res = client
        .post(format!("{}/api/orders", sys.sales_url))
        .bearer_auth(&token)
        .json(&json!({ "items": [{ "productId": id, "quantity": 2 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    wait_for_quantity(&client, &sys.inventory_url, &id, 4).await;
    assert_eq!(sys.dead_letters.count(), 1);
}

#[tokio::test]
async fn gateway_proxies_stock_patch_and_product_reads() {
    let sys = TestSystem::spawn().await;
    let client = reqwest::Client::new();
    let token = fetch_token(&client, &sys.gateway_url).await;

    let id = create_product(&client, &sys.gateway_url, &token, "Widget", 3.0, 1).await;

    let res = client
        .patch(format!("{}/api/products/{id}/stock/9", sys.gateway_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // Read back through the gateway as well.
    let res = client
        .get(format!("{}/api/products/{id}", sys.gateway_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["quantity"], 9);

    // Upstream 404s pass straight through.
    let res = client
        .get(format!(
            "{}/api/products/{}",
            sys.gateway_url,
            uuid::Uuid::now_v7()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
