//! CSV export tests against a seeded store.

use crate::{
    db::tests::harness::create_db_pool,
    services::{ExportService, tests::seeded_pool},
};

#[tokio::test]
async fn export_writes_the_standing_files_for_the_latest_month() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("exports");

    let written = ExportService::new(seeded_pool().await)
        .export_csvs(&out)
        .await
        .unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            "monthly_by_owner_2025-08.csv",
            "monthly_by_env_2025-08.csv",
            "top_resources_2025-08.csv",
            "unit_cost_changes.csv",
        ]
    );
    for path in &written {
        assert!(path.exists());
    }
}

#[tokio::test]
async fn owner_export_reflects_the_owner_breakdown() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("exports");

    ExportService::new(seeded_pool().await)
        .export_csvs(&out)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(out.join("monthly_by_owner_2025-08.csv")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "owner,cost");
    assert_eq!(lines[1], "unassigned,2500");
    assert_eq!(lines.len(), 4);
}

#[tokio::test]
async fn export_over_an_empty_store_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("exports");

    let written = ExportService::new(create_db_pool().await)
        .export_csvs(&out)
        .await
        .unwrap();

    assert!(written.is_empty());
    assert!(!out.exists());
}
