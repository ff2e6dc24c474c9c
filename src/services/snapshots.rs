use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    config::SnapshotConfig,
    models::{GroupCost, OwnerCoverage},
    services::error::ServiceResult,
};

/// Materialized KPI results for one month: owner totals, environment
/// totals, and coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSnapshot {
    pub month: String,
    pub by_owner: Vec<GroupCost>,
    pub by_env: Vec<GroupCost>,
    pub coverage: OwnerCoverage,
}

/// On-disk per-month KPI cache: `<dir>/<month>/{owner.csv,env.csv,coverage.json}`.
///
/// Written only when the caller asks, read back opportunistically, and
/// invalidated only by explicit request. Nothing here runs in the
/// background or expires on its own.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            dir: config.dir.clone(),
        }
    }

    fn month_dir(&self, month: &str) -> PathBuf {
        self.dir.join(month)
    }

    /// Persist a snapshot, replacing any previous one for the month.
    pub fn write_month(&self, snapshot: &MonthSnapshot) -> ServiceResult<()> {
        let dir = self.month_dir(&snapshot.month);
        std::fs::create_dir_all(&dir)?;

        write_group_csv(&dir.join("owner.csv"), "owner", &snapshot.by_owner)?;
        write_group_csv(&dir.join("env.csv"), "env", &snapshot.by_env)?;

        let coverage = serde_json::to_string_pretty(&snapshot.coverage)?;
        std::fs::write(dir.join("coverage.json"), coverage)?;

        tracing::info!(month = %snapshot.month, dir = %dir.display(), "Wrote KPI snapshot");
        Ok(())
    }

    /// Load a cached snapshot if all three artifacts are present.
    pub fn load_month(&self, month: &str) -> ServiceResult<Option<MonthSnapshot>> {
        let dir = self.month_dir(month);
        let owner_file = dir.join("owner.csv");
        let env_file = dir.join("env.csv");
        let coverage_file = dir.join("coverage.json");

        if !owner_file.exists() || !env_file.exists() || !coverage_file.exists() {
            return Ok(None);
        }

        let by_owner = read_group_csv(&owner_file)?;
        let by_env = read_group_csv(&env_file)?;
        let coverage: CoverageFile = serde_json::from_str(&std::fs::read_to_string(coverage_file)?)?;

        Ok(Some(MonthSnapshot {
            month: month.to_string(),
            by_owner,
            by_env,
            coverage: OwnerCoverage {
                month: coverage.month,
                total_cost: coverage.total_cost,
                assigned_cost: coverage.assigned_cost,
                coverage_pct: coverage.coverage_pct,
            },
        }))
    }

    /// Drop the cached snapshot for a month. Returns whether anything was
    /// removed.
    pub fn invalidate(&self, month: &str) -> ServiceResult<bool> {
        let dir = self.month_dir(month);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)?;
        tracing::info!(month, "Invalidated KPI snapshot");
        Ok(true)
    }
}

/// Serde mirror for coverage.json so the on-disk shape stays stable even
/// if the in-memory type grows fields.
#[derive(Deserialize)]
struct CoverageFile {
    month: String,
    total_cost: f64,
    assigned_cost: f64,
    coverage_pct: f64,
}

fn write_group_csv(path: &Path, dimension: &str, rows: &[GroupCost]) -> ServiceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([dimension, "cost"])?;
    for row in rows {
        writer.write_record([row.group.as_str(), &row.cost.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn read_group_csv(path: &Path) -> ServiceResult<Vec<GroupCost>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let group = record.get(0).unwrap_or_default().to_string();
        let cost = record
            .get(1)
            .and_then(|c| c.parse::<f64>().ok())
            .unwrap_or(0.0);
        rows.push(GroupCost { group, cost });
    }
    Ok(rows)
}
