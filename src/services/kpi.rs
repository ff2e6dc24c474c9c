use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    db::DbPool,
    models::{
        CostDriver, EnrichedRecord, GroupBy, GroupCost, OwnerCoverage, TrendTable, UnitCostChange,
    },
    services::{EnrichmentService, error::ServiceResult, round4},
};

/// Read-only KPI queries over the enriched billing view.
///
/// Every query re-enriches from the store: computations are pure functions
/// of the current table contents, with no shared state between calls.
#[derive(Clone)]
pub struct KpiService {
    enrichment: EnrichmentService,
}

impl KpiService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            enrichment: EnrichmentService::new(db),
        }
    }

    /// Cost per owner for one month, highest first.
    pub async fn monthly_cost_by_owner(&self, month: &str) -> ServiceResult<Vec<GroupCost>> {
        let rows = self.enrichment.enrich().await?;
        Ok(group_cost_for_month(&rows, month, |r| &r.owner))
    }

    /// Cost per environment for one month, highest first.
    pub async fn monthly_cost_by_env(&self, month: &str) -> ServiceResult<Vec<GroupCost>> {
        let rows = self.enrichment.enrich().await?;
        Ok(group_cost_for_month(&rows, month, |r| &r.env))
    }

    /// Fraction of one month's cost attributable to a known owner.
    pub async fn owner_coverage(&self, month: &str) -> ServiceResult<OwnerCoverage> {
        let rows = self.enrichment.enrich().await?;
        Ok(owner_coverage(&rows, month))
    }

    /// Cost pivot over the six most recent months, grouped by owner or env.
    pub async fn six_month_trend(&self, group_by: GroupBy) -> ServiceResult<TrendTable> {
        let rows = self.enrichment.enrich().await?;
        Ok(six_month_trend(&rows, group_by))
    }

    /// The `n` most expensive (resource, service, group, owner) cohorts in
    /// one month.
    pub async fn top_n_cost_drivers(&self, month: &str, n: usize) -> ServiceResult<Vec<CostDriver>> {
        let rows = self.enrichment.enrich().await?;
        Ok(top_n_cost_drivers(&rows, month, n))
    }

    /// Resource-months whose mean unit cost moved by at least
    /// `threshold_pct` (either direction) against the previous month
    /// present for that resource.
    pub async fn unit_cost_changes(&self, threshold_pct: f64) -> ServiceResult<Vec<UnitCostChange>> {
        let rows = self.enrichment.enrich().await?;
        Ok(unit_cost_changes(&rows, threshold_pct))
    }
}

/// Group one month's rows and sum cost, descending. Grouping preserves
/// first-seen order and the sort is stable, so ties keep input order.
pub(crate) fn group_cost_for_month<'a>(
    rows: &'a [EnrichedRecord],
    month: &str,
    key: impl Fn(&'a EnrichedRecord) -> &'a str,
) -> Vec<GroupCost> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupCost> = Vec::new();

    for row in rows.iter().filter(|r| r.invoice_month == month) {
        let k = key(row);
        match index.get(k) {
            Some(&i) => groups[i].cost += row.cost,
            None => {
                index.insert(k, groups.len());
                groups.push(GroupCost {
                    group: k.to_string(),
                    cost: row.cost,
                });
            }
        }
    }

    groups.sort_by(|a, b| b.cost.partial_cmp(&a.cost).unwrap_or(Ordering::Equal));
    groups
}

pub(crate) fn owner_coverage(rows: &[EnrichedRecord], month: &str) -> OwnerCoverage {
    let mut total_cost = 0.0;
    let mut assigned_cost = 0.0;

    for row in rows.iter().filter(|r| r.invoice_month == month) {
        total_cost += row.cost;
        if row.is_assigned() {
            assigned_cost += row.cost;
        }
    }

    // defined as zero for an empty or zero-cost month
    let coverage_pct = if total_cost > 0.0 {
        assigned_cost / total_cost
    } else {
        0.0
    };

    OwnerCoverage {
        month: month.to_string(),
        total_cost,
        assigned_cost,
        coverage_pct: round4(coverage_pct),
    }
}

pub(crate) fn six_month_trend(rows: &[EnrichedRecord], group_by: GroupBy) -> TrendTable {
    // Lexicographic order on YYYY-MM strings is chronological order.
    let months: BTreeSet<&str> = rows.iter().map(|r| r.invoice_month.as_str()).collect();
    if months.is_empty() {
        return TrendTable::default();
    }
    let window: Vec<&str> = months.iter().rev().take(6).rev().copied().collect();
    let in_window: BTreeSet<&str> = window.iter().copied().collect();

    let group_of = |r: &EnrichedRecord| -> String {
        match group_by {
            GroupBy::Owner => r.owner.clone(),
            GroupBy::Env => r.env.clone(),
        }
    };

    let mut sums: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut groups: BTreeSet<String> = BTreeSet::new();
    for row in rows
        .iter()
        .filter(|r| in_window.contains(r.invoice_month.as_str()))
    {
        let g = group_of(row);
        groups.insert(g.clone());
        *sums.entry((row.invoice_month.clone(), g)).or_insert(0.0) += row.cost;
    }

    let groups: Vec<String> = groups.into_iter().collect();
    let values = window
        .iter()
        .map(|month| {
            groups
                .iter()
                .map(|g| {
                    sums.get(&(month.to_string(), g.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    TrendTable {
        months: window.into_iter().map(String::from).collect(),
        groups,
        values,
    }
}

pub(crate) fn top_n_cost_drivers(
    rows: &[EnrichedRecord],
    month: &str,
    n: usize,
) -> Vec<CostDriver> {
    type Key = (Option<String>, Option<String>, Option<String>, String);

    let mut index: HashMap<Key, usize> = HashMap::new();
    let mut drivers: Vec<CostDriver> = Vec::new();

    for row in rows.iter().filter(|r| r.invoice_month == month) {
        let key: Key = (
            row.resource_id.clone(),
            row.service.clone(),
            row.resource_group.clone(),
            row.owner.clone(),
        );
        match index.get(&key) {
            Some(&i) => drivers[i].cost += row.cost,
            None => {
                index.insert(key, drivers.len());
                drivers.push(CostDriver {
                    resource_id: row.resource_id.clone(),
                    service: row.service.clone(),
                    resource_group: row.resource_group.clone(),
                    owner: row.owner.clone(),
                    cost: row.cost,
                });
            }
        }
    }

    drivers.sort_by(|a, b| b.cost.partial_cmp(&a.cost).unwrap_or(Ordering::Equal));
    drivers.truncate(n);
    drivers
}

pub(crate) fn unit_cost_changes(rows: &[EnrichedRecord], threshold_pct: f64) -> Vec<UnitCostChange> {
    // mean unit cost per (resource, month); rows without a resource id
    // cannot be tracked across months and are excluded
    let mut agg: BTreeMap<&str, BTreeMap<&str, (f64, usize)>> = BTreeMap::new();
    for row in rows {
        let Some(id) = row.resource_id.as_deref() else {
            continue;
        };
        let entry = agg
            .entry(id)
            .or_default()
            .entry(row.invoice_month.as_str())
            .or_insert((0.0, 0));
        entry.0 += row.unit_cost;
        entry.1 += 1;
    }

    let mut flagged = Vec::new();
    for (resource_id, by_month) in &agg {
        let mut prev: Option<f64> = None;
        for (month, (sum, count)) in by_month {
            let mean = sum / *count as f64;
            if let Some(prev_cost) = prev {
                // zero previous cost would divide by zero; skip the row
                if prev_cost != 0.0 {
                    let pct_change = (mean - prev_cost) / prev_cost;
                    if pct_change.abs() >= threshold_pct {
                        flagged.push(UnitCostChange {
                            resource_id: resource_id.to_string(),
                            invoice_month: month.to_string(),
                            unit_cost: mean,
                            prev_unit_cost: prev_cost,
                            pct_change: round4(pct_change),
                        });
                    }
                }
            }
            prev = Some(mean);
        }
    }

    flagged.sort_by(|a, b| {
        b.pct_change
            .partial_cmp(&a.pct_change)
            .unwrap_or(Ordering::Equal)
    });
    flagged
}
