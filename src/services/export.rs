use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    db::DbPool,
    models::{CostDriver, GroupCost, UnitCostChange},
    services::{EnrichmentService, KpiService, error::ServiceResult},
};

/// Unit-cost change threshold used for the standing export.
const EXPORT_UNIT_CHANGE_THRESHOLD: f64 = 0.2;

/// Number of cost drivers included in the standing export.
const EXPORT_TOP_N: usize = 50;

/// Writes the standing CSV exports for the latest month: owner and env
/// breakdowns, top cost drivers, and unit-cost changes.
pub struct ExportService {
    enrichment: EnrichmentService,
    kpi: KpiService,
}

impl ExportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            enrichment: EnrichmentService::new(Arc::clone(&db)),
            kpi: KpiService::new(db),
        }
    }

    /// Export KPI CSVs into `out_dir`, returning the files written.
    /// An empty billing table exports nothing.
    pub async fn export_csvs(&self, out_dir: &Path) -> ServiceResult<Vec<PathBuf>> {
        let rows = self.enrichment.enrich().await?;
        let Some(latest) = rows
            .iter()
            .map(|r| r.invoice_month.as_str())
            .max()
            .map(String::from)
        else {
            tracing::warn!("No months found in billing table, nothing to export");
            return Ok(Vec::new());
        };

        std::fs::create_dir_all(out_dir)?;
        let mut written = Vec::new();

        let by_owner = self.kpi.monthly_cost_by_owner(&latest).await?;
        let path = out_dir.join(format!("monthly_by_owner_{latest}.csv"));
        write_group_csv(&path, "owner", &by_owner)?;
        written.push(path);

        let by_env = self.kpi.monthly_cost_by_env(&latest).await?;
        let path = out_dir.join(format!("monthly_by_env_{latest}.csv"));
        write_group_csv(&path, "env", &by_env)?;
        written.push(path);

        let top = self.kpi.top_n_cost_drivers(&latest, EXPORT_TOP_N).await?;
        let path = out_dir.join(format!("top_resources_{latest}.csv"));
        write_drivers_csv(&path, &top)?;
        written.push(path);

        let changes = self
            .kpi
            .unit_cost_changes(EXPORT_UNIT_CHANGE_THRESHOLD)
            .await?;
        let path = out_dir.join("unit_cost_changes.csv");
        write_changes_csv(&path, &changes)?;
        written.push(path);

        tracing::info!(dir = %out_dir.display(), files = written.len(), "Exported KPI CSVs");
        Ok(written)
    }
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

fn write_drivers_csv(path: &Path, rows: &[CostDriver]) -> ServiceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["resource_id", "service", "resource_group", "owner", "cost"])?;
    for row in rows {
        writer.write_record([
            row.resource_id.as_deref().unwrap_or(""),
            row.service.as_deref().unwrap_or(""),
            row.resource_group.as_deref().unwrap_or(""),
            &row.owner,
            &row.cost.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_changes_csv(path: &Path, rows: &[UnitCostChange]) -> ServiceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "resource_id",
        "invoice_month",
        "unit_cost",
        "prev_unit_cost",
        "pct_change",
    ])?;
    for row in rows {
        writer.write_record([
            row.resource_id.as_str(),
            &row.invoice_month,
            &row.unit_cost.to_string(),
            &row.prev_unit_cost.to_string(),
            &row.pct_change.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
