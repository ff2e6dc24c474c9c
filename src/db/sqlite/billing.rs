use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::BillingRepo},
    models::BillingRow,
};

pub struct SqliteBillingRepo {
    pool: SqlitePool,
}

impl SqliteBillingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingRepo for SqliteBillingRepo {
    async fn fetch_all(&self) -> DbResult<Vec<BillingRow>> {
        let rows = sqlx::query(
            r#"
            SELECT invoice_month, account_id, subscription, service,
                   resource_group, resource_id, region,
                   usage_qty, unit_cost, cost
            FROM billing
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| BillingRow {
                invoice_month: row.get("invoice_month"),
                account_id: row.get("account_id"),
                subscription: row.get("subscription"),
                service: row.get("service"),
                resource_group: row.get("resource_group"),
                resource_id: row.get("resource_id"),
                region: row.get("region"),
                usage_qty: row.get("usage_qty"),
                unit_cost: row.get("unit_cost"),
                cost: row.get("cost"),
            })
            .collect())
    }

    async fn insert_batch(&self, rows: &[BillingRow]) -> DbResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        // SQLite caps bound parameters at 999 per statement. Each row binds
        // 10, so 90 rows per chunk leaves headroom for future columns.
        const MAX_ROWS_PER_BATCH: usize = 90;

        let mut total_inserted = 0;
        let mut tx = self.pool.begin().await?;

        for chunk in rows.chunks(MAX_ROWS_PER_BATCH) {
            let placeholders: Vec<&str> = chunk
                .iter()
                .map(|_| "(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
                .collect();

            let query = format!(
                r#"
                INSERT INTO billing (
                    invoice_month, account_id, subscription, service,
                    resource_group, resource_id, region,
                    usage_qty, unit_cost, cost
                )
                VALUES {}
                "#,
                placeholders.join(", ")
            );

            let mut query_builder = sqlx::query(&query);
            for row in chunk {
                query_builder = query_builder
                    .bind(&row.invoice_month)
                    .bind(&row.account_id)
                    .bind(&row.subscription)
                    .bind(&row.service)
                    .bind(&row.resource_group)
                    .bind(&row.resource_id)
                    .bind(&row.region)
                    .bind(&row.usage_qty)
                    .bind(&row.unit_cost)
                    .bind(&row.cost);
            }

            let result = query_builder.execute(&mut *tx).await?;
            total_inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    async fn count(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM billing")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}
