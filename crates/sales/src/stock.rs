use async_trait::async_trait;
use thiserror::Error;

use stockline_core::ProductId;

use crate::snapshot::StockSnapshot;

/// Stock query failure.
///
/// Transport failure is deliberately distinct from "not found": a timeout or
/// a refused connection must never be read as "the product does not exist".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockQueryError {
    #[error("stock query upstream unavailable: {0}")]
    Unavailable(String),
}

/// Port to the inventory side's synchronous stock query.
///
/// `Ok(None)` means the product is not known to inventory. Implementations
/// must not mutate state and must carry a bounded timeout.
#[async_trait]
pub trait StockQuery: Send + Sync {
    async fn snapshot(&self, id: ProductId) -> Result<Option<StockSnapshot>, StockQueryError>;
}
