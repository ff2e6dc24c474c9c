use async_trait::async_trait;

use crate::{db::error::DbResult, models::BillingRow};

#[async_trait]
pub trait BillingRepo: Send + Sync {
    /// Fetch every billing row in stable insertion order.
    ///
    /// Analytics recomputes from the full table on every call, so ordering
    /// must be deterministic: sort ties in downstream aggregations are
    /// broken by this order.
    async fn fetch_all(&self) -> DbResult<Vec<BillingRow>>;

    /// Insert a batch of billing rows, preserving source values verbatim.
    /// Returns the number of rows inserted.
    async fn insert_batch(&self, rows: &[BillingRow]) -> DbResult<usize>;

    async fn count(&self) -> DbResult<i64>;
}
