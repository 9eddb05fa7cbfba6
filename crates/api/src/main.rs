use std::sync::Arc;

use anyhow::Context;
use axum::Router;

use stockline_api::app::services::{GatewayState, InventoryState, SalesState};
use stockline_api::{app, config::Config};
use stockline_auth::TokenService;
use stockline_events::{InMemorySaleTopic, SalePublisher, SaleQueue};
use stockline_infra::store::{PgOrderStore, PgProductStore};
use stockline_infra::{
    DeadLetters, HttpStockQuery, InMemoryOrderStore, InMemoryProductStore, OrderPlacement,
    OrderStore, ProductStore, ReconciliationConsumer,
};

/// Queue the reconciliation consumer binds to the sale topic.
const STOCK_QUEUE: &str = "inventory.stock";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockline_observability::init();

    let config = Config::from_env();

    let tokens = Arc::new(TokenService::new(
        config.jwt_secret.as_bytes(),
        &config.jwt_issuer,
        &config.jwt_audience,
    ));

    let (products, orders) = build_stores().await?;
    let (publisher, queue) = build_channel()?;

    let dead_letters = Arc::new(DeadLetters::new());
    let consumer =
        ReconciliationConsumer::new(products.clone(), queue, dead_letters.clone()).spawn();

    let stock = HttpStockQuery::new(config.inventory_base_url.clone(), config.stock_http_timeout)
        .context("building stock query client")?;
    let placement = OrderPlacement::new(
        Arc::new(stock),
        orders.clone(),
        publisher,
        config.stock_check_mode,
    );

    let inventory_app = app::build_inventory_app(
        InventoryState {
            products: products.clone(),
        },
        tokens.clone(),
    );
    let sales_app = app::build_sales_app(
        SalesState {
            placement,
            orders: orders.clone(),
        },
        tokens.clone(),
    );
    let gateway_app = app::build_gateway_app(GatewayState {
        tokens,
        client: reqwest::Client::new(),
        inventory_base_url: config.inventory_base_url.clone(),
        sales_base_url: config.sales_base_url.clone(),
    });

    let _inventory = serve("inventory", config.inventory_addr.clone(), inventory_app).await?;
    let _sales = serve("sales", config.sales_addr.clone(), sales_app).await?;
    let _gateway = serve("gateway", config.gateway_addr.clone(), gateway_app).await?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!(
        dead_letters = dead_letters.count(),
        "shutting down"
    );
    consumer.shutdown().await;

    Ok(())
}

/// Postgres stores when `DATABASE_URL` is set, in-memory otherwise.
async fn build_stores() -> anyhow::Result<(Arc<dyn ProductStore>, Arc<dyn OrderStore>)> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url)
                .await
                .context("connecting to postgres")?;
            let products = PgProductStore::new(pool.clone());
            products.ensure_schema().await?;
            let orders = PgOrderStore::new(pool);
            orders.ensure_schema().await?;
            Ok((Arc::new(products), Arc::new(orders)))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Ok((
                Arc::new(InMemoryProductStore::new()),
                Arc::new(InMemoryOrderStore::new()),
            ))
        }
    }
}

#[cfg(feature = "redis")]
fn build_channel() -> anyhow::Result<(Arc<dyn SalePublisher>, Arc<dyn SaleQueue>)> {
    if let Ok(url) = std::env::var("REDIS_URL") {
        let channel = stockline_infra::channel::RedisSaleChannel::new(&url, "stockline:sales")
            .context("connecting to redis")?;
        let queue = channel.bind_queue(STOCK_QUEUE).context("binding queue")?;
        return Ok((Arc::new(channel), Arc::new(queue)));
    }
    in_memory_channel()
}

#[cfg(not(feature = "redis"))]
fn build_channel() -> anyhow::Result<(Arc<dyn SalePublisher>, Arc<dyn SaleQueue>)> {
    in_memory_channel()
}

fn in_memory_channel() -> anyhow::Result<(Arc<dyn SalePublisher>, Arc<dyn SaleQueue>)> {
    let topic = Arc::new(InMemorySaleTopic::new());
    let queue = topic.bind_queue(STOCK_QUEUE);
    Ok((topic, Arc::new(queue)))
}

async fn serve(
    name: &'static str,
    addr: String,
    app: Router,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {name} on {addr}"))?;
    tracing::info!(service = name, addr = %listener.local_addr()?, "listening");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(service = name, error = %e, "server exited");
        }
    }))
}
