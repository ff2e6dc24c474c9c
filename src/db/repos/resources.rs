use async_trait::async_trait;

use crate::{db::error::DbResult, models::ResourceRow};

#[async_trait]
pub trait ResourceRepo: Send + Sync {
    /// Fetch all resource metadata rows.
    async fn fetch_all(&self) -> DbResult<Vec<ResourceRow>>;

    /// Insert or replace a resource metadata row keyed by `resource_id`.
    async fn upsert(&self, row: &ResourceRow) -> DbResult<()>;

    async fn count(&self) -> DbResult<i64>;
}
