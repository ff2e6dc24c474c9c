//! End-to-end ingestion tests over temporary CSV files and an in-memory
//! store.

use std::{io::Write, path::PathBuf};

use crate::{
    db::tests::harness::create_db_pool,
    services::{IngestService, ServiceError},
};

const BILLING_HEADER: &str = "invoice_month,account_id,subscription,service,resource_group,resource_id,region,usage_qty,unit_cost,cost";

fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[tokio::test]
async fn billing_csv_lands_in_the_store_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_csv(
        &tmp,
        "billing.csv",
        &format!(
            "{BILLING_HEADER}\n\
             2025-08,acct-1,sub-1,Compute,rg-app,res1,eu-west,10,10,100\n\
             2025-08,acct-1,sub-1,Storage,rg-app,res2,eu-west,not-a-number,5,\n"
        ),
    );

    let db = create_db_pool().await;
    let summary = IngestService::new(db.clone()).ingest_csv(&path).await.unwrap();
    assert_eq!(summary.rows_inserted, 2);

    let rows = db.billing().fetch_all().await.unwrap();
    assert_eq!(rows[0].cost.as_deref(), Some("100"));
    // malformed and empty values survive untouched
    assert_eq!(rows[1].usage_qty.as_deref(), Some("not-a-number"));
    assert_eq!(rows[1].cost, None);
}

#[tokio::test]
async fn missing_required_column_aborts_ingestion() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_csv(
        &tmp,
        "billing.csv",
        "invoice_month,resource_id\n2025-08,res1\n",
    );

    let db = create_db_pool().await;
    let err = IngestService::new(db.clone()).ingest_csv(&path).await.unwrap_err();
    assert!(matches!(err, ServiceError::MissingData(_)));
    assert_eq!(db.billing().count().await.unwrap(), 0);
}

#[tokio::test]
async fn quality_issues_are_reported_but_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_csv(
        &tmp,
        "billing.csv",
        &format!(
            "{BILLING_HEADER}\n\
             2025-08,acct-1,sub-1,Compute,rg-app,res1,eu-west,10,10,250\n\
             2025-08,acct-1,sub-1,Compute,rg-app,res1,eu-west,1,-5,-5\n"
        ),
    );

    let db = create_db_pool().await;
    let summary = IngestService::new(db).ingest_csv(&path).await.unwrap();

    // everything still lands despite the findings
    assert_eq!(summary.rows_inserted, 2);
    assert!(summary.issues.iter().any(|i| i.contains("Negative values")));
    assert!(summary.issues.iter().any(|i| i.contains("Duplicate rows")));
    assert!(
        summary
            .issues
            .iter()
            .any(|i| i.contains("usage_qty * unit_cost != cost"))
    );
}

#[tokio::test]
async fn resources_csv_upserts_metadata() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_csv(
        &tmp,
        "resources.csv",
        "resource_id,owner,env,tags_json\n\
         res1,team1,prod,\"{\"\"cc\"\":\"\"cc-1\"\"}\"\n\
         res2,,dev,\n\
         ,ghost,prod,\n",
    );

    let db = create_db_pool().await;
    let applied = IngestService::new(db.clone())
        .ingest_resources_csv(&path)
        .await
        .unwrap();

    // the row without a resource_id is skipped
    assert_eq!(applied, 2);
    let rows = db.resources().fetch_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].resource_id, "res1");
    assert_eq!(rows[0].owner.as_deref(), Some("team1"));
    assert_eq!(rows[0].tags_json.as_deref(), Some(r#"{"cc":"cc-1"}"#));
    assert_eq!(rows[1].owner, None);
}

#[tokio::test]
async fn resources_csv_without_id_column_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_csv(&tmp, "resources.csv", "owner,env\nteam1,prod\n");

    let db = create_db_pool().await;
    let err = IngestService::new(db)
        .ingest_resources_csv(&path)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::MissingData(_)));
}
