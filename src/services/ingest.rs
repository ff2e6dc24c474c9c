use std::{collections::HashSet, path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::DbPool,
    models::{BillingRow, ResourceRow},
    services::{
        CoercionPolicy,
        error::{ServiceError, ServiceResult},
    },
};

/// Column set a billing export must provide.
const REQUIRED_COLUMNS: [&str; 10] = [
    "invoice_month",
    "account_id",
    "subscription",
    "service",
    "resource_group",
    "resource_id",
    "region",
    "usage_qty",
    "unit_cost",
    "cost",
];

/// Relative and absolute tolerance for the `cost ≈ usage_qty × unit_cost`
/// consistency check. Mismatches are reported, never enforced.
const COST_CHECK_RTOL: f64 = 1e-3;
const COST_CHECK_ATOL: f64 = 1e-2;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub rows_inserted: usize,
    /// Soft data-quality findings. Ingestion proceeds regardless.
    pub issues: Vec<String>,
    pub ingested_at: DateTime<Utc>,
}

/// Loads billing exports and resource metadata into the store.
///
/// Source values are preserved verbatim; the quality checks mirror what
/// analytics will later coerce, so findings here explain zeroes there.
#[derive(Clone)]
pub struct IngestService {
    db: Arc<DbPool>,
}

impl IngestService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Ingest a billing CSV file. Missing required columns are a hard
    /// error; everything else is reported as a soft issue and ingested
    /// anyway.
    pub async fn ingest_csv(&self, path: &Path) -> ServiceResult<IngestSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let index_of = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| index_of(c).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::MissingData(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let field = |record: &csv::StringRecord, name: &str| -> Option<String> {
            let value = record.get(index_of(name)?)?;
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(BillingRow {
                invoice_month: field(&record, "invoice_month").unwrap_or_default(),
                account_id: field(&record, "account_id"),
                subscription: field(&record, "subscription"),
                service: field(&record, "service"),
                resource_group: field(&record, "resource_group"),
                resource_id: field(&record, "resource_id"),
                region: field(&record, "region"),
                usage_qty: field(&record, "usage_qty"),
                unit_cost: field(&record, "unit_cost"),
                cost: field(&record, "cost"),
            });
        }

        let issues = quality_checks(&rows);
        if issues.is_empty() {
            tracing::info!("No data-quality issues detected");
        } else {
            for issue in &issues {
                tracing::warn!("Data quality issue: {issue}");
            }
        }

        let rows_inserted = self.db.billing().insert_batch(&rows).await?;
        tracing::info!(rows = rows_inserted, path = %path.display(), "Ingested billing rows");

        Ok(IngestSummary {
            rows_inserted,
            issues,
            ingested_at: Utc::now(),
        })
    }

    /// Upsert resource metadata from a CSV with columns
    /// `resource_id,owner,env,tags_json`. Returns the number of rows
    /// applied; rows without a resource id are skipped with a warning.
    pub async fn ingest_resources_csv(&self, path: &Path) -> ServiceResult<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let index_of = |name: &str| headers.iter().position(|h| h == name);
        if index_of("resource_id").is_none() {
            return Err(ServiceError::MissingData(
                "missing required column: resource_id".into(),
            ));
        }

        let repo = self.db.resources();
        let mut applied = 0;
        for record in reader.records() {
            let record = record?;
            let field = |name: &str| -> Option<String> {
                let value = record.get(index_of(name)?)?;
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            };

            let Some(resource_id) = field("resource_id") else {
                tracing::warn!("Skipping resource row without a resource_id");
                continue;
            };

            repo.upsert(&ResourceRow {
                resource_id,
                owner: field("owner"),
                env: field("env"),
                tags_json: field("tags_json"),
            })
            .await?;
            applied += 1;
        }

        tracing::info!(rows = applied, path = %path.display(), "Upserted resource metadata");
        Ok(applied)
    }
}

/// Soft data-quality checks over parsed billing rows.
fn quality_checks(rows: &[BillingRow]) -> Vec<String> {
    let mut issues = Vec::new();
    let policy = CoercionPolicy::Lenient;

    // null counts per column
    let mut null_counts: Vec<(&str, usize)> = Vec::new();
    let columns: [(&str, fn(&BillingRow) -> bool); 9] = [
        ("account_id", |r| r.account_id.is_none()),
        ("subscription", |r| r.subscription.is_none()),
        ("service", |r| r.service.is_none()),
        ("resource_group", |r| r.resource_group.is_none()),
        ("resource_id", |r| r.resource_id.is_none()),
        ("region", |r| r.region.is_none()),
        ("usage_qty", |r| r.usage_qty.is_none()),
        ("unit_cost", |r| r.unit_cost.is_none()),
        ("cost", |r| r.cost.is_none()),
    ];
    for (name, is_null) in columns {
        let count = rows.iter().filter(|r| is_null(r)).count();
        if count > 0 {
            null_counts.push((name, count));
        }
    }
    if !null_counts.is_empty() {
        let summary: Vec<String> = null_counts
            .iter()
            .map(|(name, count)| format!("{name}: {count}"))
            .collect();
        issues.push(format!("Nulls found: {}", summary.join(", ")));
    }

    // negative costs
    let negative = rows
        .iter()
        .filter_map(|r| r.cost.as_deref())
        .filter_map(|c| c.trim().parse::<f64>().ok())
        .any(|c| c < 0.0);
    if negative {
        issues.push("Negative values in 'cost' column".into());
    }

    // duplicate (resource_id, invoice_month) pairs
    let mut seen = HashSet::new();
    let duplicated = rows
        .iter()
        .any(|r| !seen.insert((r.resource_id.clone(), r.invoice_month.clone())));
    if duplicated {
        issues.push("Duplicate rows by (resource_id, invoice_month)".into());
    }

    // cost ≈ usage_qty × unit_cost within tolerance
    let mismatches = rows
        .iter()
        .filter(|r| {
            let usage = policy.coerce(r.usage_qty.as_deref());
            let unit = policy.coerce(r.unit_cost.as_deref());
            let cost = policy.coerce(r.cost.as_deref());
            let expected = usage * unit;
            (expected - cost).abs() > COST_CHECK_ATOL + COST_CHECK_RTOL * cost.abs()
        })
        .count();
    if mismatches > 0 {
        issues.push(format!(
            "{mismatches} rows where usage_qty * unit_cost != cost (possible data issue)"
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: &str, id: &str, usage: &str, unit: &str, cost: &str) -> BillingRow {
        BillingRow {
            invoice_month: month.into(),
            resource_id: Some(id.into()),
            usage_qty: Some(usage.into()),
            unit_cost: Some(unit.into()),
            cost: Some(cost.into()),
            account_id: Some("acct".into()),
            subscription: Some("sub".into()),
            service: Some("svc".into()),
            resource_group: Some("rg".into()),
            region: Some("eu".into()),
        }
    }

    #[test]
    fn clean_rows_have_no_issues() {
        let rows = vec![
            row("2025-08", "vm-1", "10", "10", "100"),
            row("2025-08", "vm-2", "2", "5", "10"),
        ];
        assert!(quality_checks(&rows).is_empty());
    }

    #[test]
    fn mismatched_cost_is_reported() {
        let rows = vec![row("2025-08", "vm-1", "10", "10", "250")];
        let issues = quality_checks(&rows);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("usage_qty * unit_cost != cost"));
    }

    #[test]
    fn duplicates_negatives_and_nulls_are_reported() {
        let mut first = row("2025-08", "vm-1", "1", "-5", "-5");
        first.region = None;
        let rows = vec![first, row("2025-08", "vm-1", "1", "-5", "-5")];

        let issues = quality_checks(&rows);
        assert!(issues.iter().any(|i| i.starts_with("Nulls found")));
        assert!(issues.iter().any(|i| i.contains("Negative values")));
        assert!(issues.iter().any(|i| i.contains("Duplicate rows")));
    }
}
