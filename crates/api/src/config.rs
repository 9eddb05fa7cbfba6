//! Environment-driven configuration.

use std::time::Duration;

use stockline_infra::StockCheckMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub gateway_addr: String,
    pub inventory_addr: String,
    pub sales_addr: String,
    /// Where the sales side (and the gateway proxy) reaches inventory.
    pub inventory_base_url: String,
    pub sales_base_url: String,
    pub stock_http_timeout: Duration,
    pub stock_check_mode: StockCheckMode,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let inventory_addr = env_or("INVENTORY_ADDR", "0.0.0.0:5102");
        let sales_addr = env_or("SALES_ADDR", "0.0.0.0:5101");

        Self {
            jwt_secret,
            jwt_issuer: env_or("JWT_ISSUER", "stockline-gateway"),
            jwt_audience: env_or("JWT_AUDIENCE", "stockline-services"),
            gateway_addr: env_or("GATEWAY_ADDR", "0.0.0.0:8080"),
            inventory_base_url: env_or("INVENTORY_BASE_URL", "http://127.0.0.1:5102"),
            sales_base_url: env_or("SALES_BASE_URL", "http://127.0.0.1:5101"),
            inventory_addr,
            sales_addr,
            stock_http_timeout: Duration::from_millis(parse_or("STOCK_HTTP_TIMEOUT_MS", 2000)),
            stock_check_mode: parse_or("STOCK_CHECK_MODE", StockCheckMode::Enforce),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw, "unparseable value; using default");
                default
            }
        },
        Err(_) => default,
    }
}
