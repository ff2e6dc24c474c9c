use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::ResourceRepo},
    models::ResourceRow,
};

pub struct SqliteResourceRepo {
    pool: SqlitePool,
}

impl SqliteResourceRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceRepo for SqliteResourceRepo {
    async fn fetch_all(&self) -> DbResult<Vec<ResourceRow>> {
        let rows = sqlx::query(
            r#"
            SELECT resource_id, owner, env, tags_json
            FROM resources
            ORDER BY resource_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ResourceRow {
                resource_id: row.get("resource_id"),
                owner: row.get("owner"),
                env: row.get("env"),
                tags_json: row.get("tags_json"),
            })
            .collect())
    }

    async fn upsert(&self, row: &ResourceRow) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO resources (resource_id, owner, env, tags_json)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(resource_id) DO UPDATE SET
                owner = excluded.owner,
                env = excluded.env,
                tags_json = excluded.tags_json
            "#,
        )
        .bind(&row.resource_id)
        .bind(&row.owner)
        .bind(&row.env)
        .bind(&row.tags_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM resources")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}
