//! Service-level tests over seeded in-memory stores plus shared fixtures
//! for the pure aggregation functions.

mod export;
mod ingest;
mod recommendations;

use std::sync::Arc;

use crate::{
    db::{DbPool, tests::harness::create_db_pool},
    models::{BillingRow, EnrichedRecord, ResourceRow},
};

/// Build an enriched record with fixture defaults for the columns the
/// aggregations ignore.
pub(crate) fn record(
    month: &str,
    resource_id: Option<&str>,
    usage_qty: f64,
    unit_cost: f64,
    cost: f64,
    owner: &str,
    env: &str,
) -> EnrichedRecord {
    EnrichedRecord {
        invoice_month: month.into(),
        account_id: Some("acct-1".into()),
        subscription: Some("sub-1".into()),
        service: Some("Compute".into()),
        resource_group: Some("rg-app".into()),
        resource_id: resource_id.map(String::from),
        region: Some("eu-west".into()),
        usage_qty,
        unit_cost,
        cost,
        owner: owner.into(),
        env: env.into(),
        tags_json: None,
    }
}

fn billing_row(month: &str, resource_id: &str, usage: &str, unit: &str, cost: &str) -> BillingRow {
    BillingRow {
        invoice_month: month.into(),
        account_id: Some("acct-1".into()),
        subscription: Some("sub-1".into()),
        service: Some("Compute".into()),
        resource_group: Some("rg-app".into()),
        resource_id: Some(resource_id.into()),
        region: Some("eu-west".into()),
        usage_qty: Some(usage.into()),
        unit_cost: Some(unit.into()),
        cost: Some(cost.into()),
    }
}

/// One month of four resources with mixed attribution:
///
/// | resource | usage | unit | cost | owner | env  |
/// |----------|-------|------|------|-------|------|
/// | res1     | 10    | 10   | 1000 | team1 | prod |
/// | res2     | 1     | 20   | 2000 | -     | dev  |
/// | res3     | 5     | 15   | 750  | team2 | -    |
/// | res4     | 0     | 30   | 500  | -     | -    |
pub(crate) async fn seeded_pool() -> Arc<DbPool> {
    let db = create_db_pool().await;

    let rows = vec![
        billing_row("2025-08", "res1", "10", "10", "1000"),
        billing_row("2025-08", "res2", "1", "20", "2000"),
        billing_row("2025-08", "res3", "5", "15", "750"),
        billing_row("2025-08", "res4", "0", "30", "500"),
    ];
    db.billing().insert_batch(&rows).await.unwrap();

    let resources = [
        ResourceRow {
            resource_id: "res1".into(),
            owner: Some("team1".into()),
            env: Some("prod".into()),
            tags_json: Some(r#"{"cost-center":"cc-1"}"#.into()),
        },
        ResourceRow {
            resource_id: "res2".into(),
            owner: None,
            env: Some("dev".into()),
            tags_json: None,
        },
        ResourceRow {
            resource_id: "res3".into(),
            owner: Some("team2".into()),
            env: None,
            tags_json: None,
        },
    ];
    for resource in &resources {
        db.resources().upsert(resource).await.unwrap();
    }

    db
}
