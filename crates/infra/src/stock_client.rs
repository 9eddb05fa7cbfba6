//! HTTP client for the inventory stock query endpoint.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use stockline_core::{Money, ProductId};
use stockline_sales::{StockQuery, StockQueryError, StockSnapshot};

/// What the inventory service returns for `GET /api/products/{id}`.
///
/// Only the fields the order workflow needs; unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductBody {
    id: ProductId,
    name: String,
    price: Money,
    quantity: u32,
}

/// Queries live stock over HTTP against the inventory service.
///
/// Every lookup is a fresh round trip; the snapshot is stamped with the
/// local receive time and goes stale the moment it is returned.
pub struct HttpStockQuery {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStockQuery {
    /// `base_url` without a trailing slash, e.g. `http://localhost:5102`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StockQueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StockQueryError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait::async_trait]
impl StockQuery for HttpStockQuery {
    async fn snapshot(&self, id: ProductId) -> Result<Option<StockSnapshot>, StockQueryError> {
        let url = format!("{}/api/products/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StockQueryError::Unavailable(format!("GET {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StockQueryError::Unavailable(format!(
                "GET {url}: unexpected status {}",
                response.status()
            )));
        }

        let body: ProductBody = response
            .json()
            .await
            .map_err(|e| StockQueryError::Unavailable(format!("GET {url}: bad body: {e}")))?;

        Ok(Some(StockSnapshot {
            id: body.id,
            name: body.name,
            price: body.price,
            quantity: body.quantity,
            captured_at: Utc::now(),
        }))
    }
}
