use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    config::DetectorConfig,
    db::DbPool,
    models::{
        EnrichedRecord, IdleResourceDetail, Recommendation, RecommendationReport,
        SpikeResourceDetail, TagStatus, TaggingGapDetail, UNASSIGNED,
    },
    services::{EnrichmentService, error::ServiceResult, round1, round2},
};

/// Cost optimization detectors: idle resources, unit-cost spikes, and
/// tagging gaps.
///
/// Each detector consumes a fresh enrichment pass and produces at most one
/// categorical recommendation bundling every matching resource. Heuristic
/// constants and action texts come from [`DetectorConfig`].
#[derive(Clone)]
pub struct RecommendationService {
    enrichment: EnrichmentService,
    config: DetectorConfig,
}

impl RecommendationService {
    pub fn new(db: Arc<DbPool>, config: DetectorConfig) -> Self {
        Self {
            enrichment: EnrichmentService::new(db),
            config,
        }
    }

    /// Detect resources with usage far below the cohort peak despite cost
    /// above a floor, scoped to the most recent month.
    pub async fn find_idle_resources(
        &self,
        usage_threshold: f64,
        cost_threshold: f64,
    ) -> ServiceResult<Option<Recommendation>> {
        let rows = self.enrichment.enrich().await?;
        Ok(detect_idle(
            &rows,
            usage_threshold,
            cost_threshold,
            self.config.idle.savings_rate,
            &self.config.idle.actions,
        ))
    }

    /// Detect month-over-month unit-cost increases at or above
    /// `threshold_pct`. Increases only; price drops are never flagged.
    pub async fn find_cost_spikes(
        &self,
        threshold_pct: f64,
    ) -> ServiceResult<Option<Recommendation>> {
        let rows = self.enrichment.enrich().await?;
        Ok(detect_spikes(
            &rows,
            threshold_pct,
            self.config.spikes.recovery_rate,
            &self.config.spikes.actions,
        ))
    }

    /// Detect latest-month cost with missing owner/env attribution.
    pub async fn find_tagging_gaps(&self) -> ServiceResult<Option<Recommendation>> {
        let rows = self.enrichment.enrich().await?;
        Ok(detect_tagging_gaps(
            &rows,
            self.config.tagging.savings_rate,
            &self.config.tagging.actions,
        ))
    }

    /// Run all detectors with configured thresholds and merge the results.
    ///
    /// No per-detector isolation: the first failing detector aborts the
    /// whole call.
    pub async fn get_all_recommendations(&self) -> ServiceResult<RecommendationReport> {
        let mut recommendations = Vec::new();

        let idle = self
            .find_idle_resources(
                self.config.idle.usage_threshold,
                self.config.idle.cost_threshold,
            )
            .await?;
        recommendations.extend(idle);

        let spikes = self
            .find_cost_spikes(self.config.spikes.threshold_pct)
            .await?;
        recommendations.extend(spikes);

        recommendations.extend(self.find_tagging_gaps().await?);

        let total: f64 = recommendations
            .iter()
            .map(Recommendation::estimated_monthly_savings)
            .sum();

        tracing::debug!(
            count = recommendations.len(),
            total_savings = total,
            "Computed recommendations"
        );

        Ok(RecommendationReport {
            total_estimated_monthly_savings: round2(total),
            recommendations,
        })
    }
}

/// Latest month present in the data; lexicographic max equals the
/// chronological max for well-formed `YYYY-MM` strings.
fn latest_month(rows: &[EnrichedRecord]) -> Option<&str> {
    rows.iter().map(|r| r.invoice_month.as_str()).max()
}

pub(crate) fn detect_idle(
    rows: &[EnrichedRecord],
    usage_threshold: f64,
    cost_threshold: f64,
    savings_rate: f64,
    actions: &[String],
) -> Option<Recommendation> {
    let latest = latest_month(rows)?;
    let scoped: Vec<&EnrichedRecord> = rows
        .iter()
        .filter(|r| r.invoice_month == latest)
        .collect();

    let max_usage = scoped.iter().map(|r| r.usage_qty).fold(0.0, f64::max);
    if max_usage <= 0.0 {
        // utilization is undefined over an all-zero cohort; flagging
        // everything would be noise, so flag nothing
        return None;
    }

    // group flagged rows by (resource, owner, env); rows without a
    // resource id cannot be acted on and are dropped from the summary
    let mut grouped: BTreeMap<(String, String, String), (f64, f64, usize)> = BTreeMap::new();
    for row in &scoped {
        let utilization = row.usage_qty / max_usage;
        if utilization >= usage_threshold || row.cost <= cost_threshold {
            continue;
        }
        let Some(id) = row.resource_id.clone() else {
            continue;
        };
        let entry = grouped
            .entry((id, row.owner.clone(), row.env.clone()))
            .or_insert((0.0, 0.0, 0));
        entry.0 += row.cost;
        entry.1 += utilization;
        entry.2 += 1;
    }

    if grouped.is_empty() {
        return None;
    }

    let mut total_cost = 0.0;
    let resources = grouped
        .into_iter()
        .map(|((resource_id, owner, env), (cost, util_sum, n))| {
            total_cost += cost;
            let mean_utilization = util_sum / n as f64;
            IdleResourceDetail {
                resource_id,
                owner,
                environment: env,
                current_monthly_cost: round2(cost),
                utilization: round1(mean_utilization * 100.0),
                potential_savings: round2(cost * savings_rate),
            }
        })
        .collect();

    Some(Recommendation::IdleResources {
        resources,
        estimated_monthly_savings: round2(total_cost * savings_rate),
        recommended_actions: actions.to_vec(),
    })
}

pub(crate) fn detect_spikes(
    rows: &[EnrichedRecord],
    threshold_pct: f64,
    recovery_rate: f64,
    actions: &[String],
) -> Option<Recommendation> {
    let latest = latest_month(rows)?.to_string();

    // each flagged row is priced against the resource's cost in the
    // globally latest month: current exposure, not the flagged month's own
    let mut latest_cost: HashMap<&str, f64> = HashMap::new();
    for row in rows.iter().filter(|r| r.invoice_month == latest) {
        if let Some(id) = row.resource_id.as_deref() {
            *latest_cost.entry(id).or_insert(0.0) += row.cost;
        }
    }

    // mean unit cost per (resource, month), with owner/env carried along
    struct Cell<'a> {
        sum: f64,
        count: usize,
        owner: &'a str,
        env: &'a str,
    }
    let mut agg: BTreeMap<&str, BTreeMap<&str, Cell<'_>>> = BTreeMap::new();
    for row in rows {
        let Some(id) = row.resource_id.as_deref() else {
            continue;
        };
        let cell = agg
            .entry(id)
            .or_default()
            .entry(row.invoice_month.as_str())
            .or_insert(Cell {
                sum: 0.0,
                count: 0,
                owner: &row.owner,
                env: &row.env,
            });
        cell.sum += row.unit_cost;
        cell.count += 1;
    }

    let mut resources = Vec::new();
    let mut total_savings = 0.0;
    for (resource_id, by_month) in &agg {
        let mut prev: Option<f64> = None;
        for cell in by_month.values() {
            let mean = cell.sum / cell.count as f64;
            if let Some(prev_cost) = prev
                && prev_cost != 0.0
            {
                let pct_change = (mean - prev_cost) / prev_cost;
                if pct_change >= threshold_pct {
                    let current_cost = latest_cost.get(resource_id).copied().unwrap_or(0.0);
                    let savings = current_cost * pct_change * recovery_rate;
                    total_savings += savings;
                    resources.push(SpikeResourceDetail {
                        resource_id: resource_id.to_string(),
                        owner: cell.owner.to_string(),
                        environment: cell.env.to_string(),
                        unit_cost_increase: format!("{:.1}%", pct_change * 100.0),
                        current_monthly_cost: round2(current_cost),
                        potential_savings: round2(savings),
                    });
                }
            }
            prev = Some(mean);
        }
    }

    if resources.is_empty() {
        return None;
    }

    Some(Recommendation::CostSpikes {
        resources,
        estimated_monthly_savings: round2(total_savings),
        recommended_actions: actions.to_vec(),
    })
}

pub(crate) fn detect_tagging_gaps(
    rows: &[EnrichedRecord],
    savings_rate: f64,
    actions: &[String],
) -> Option<Recommendation> {
    let latest = latest_month(rows)?;

    struct GapAgg {
        cost: f64,
        owner_all_missing: bool,
        env_all_missing: bool,
    }
    let mut grouped: BTreeMap<&str, GapAgg> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.invoice_month == latest) {
        if row.owner != UNASSIGNED && row.env != UNASSIGNED {
            continue;
        }
        let Some(id) = row.resource_id.as_deref() else {
            continue;
        };
        let agg = grouped.entry(id).or_insert(GapAgg {
            cost: 0.0,
            owner_all_missing: true,
            env_all_missing: true,
        });
        agg.cost += row.cost;
        agg.owner_all_missing &= row.owner == UNASSIGNED;
        agg.env_all_missing &= row.env == UNASSIGNED;
    }

    if grouped.is_empty() {
        return None;
    }

    let status = |all_missing: bool| {
        if all_missing {
            TagStatus::Missing
        } else {
            TagStatus::Partial
        }
    };

    let mut total_cost = 0.0;
    let resources = grouped
        .into_iter()
        .map(|(resource_id, agg)| {
            total_cost += agg.cost;
            TaggingGapDetail {
                resource_id: resource_id.to_string(),
                owner_tag: status(agg.owner_all_missing),
                environment_tag: status(agg.env_all_missing),
                monthly_unattributed_cost: round2(agg.cost),
                potential_savings: round2(agg.cost * savings_rate),
            }
        })
        .collect();

    Some(Recommendation::TaggingGaps {
        resources,
        estimated_monthly_savings: round2(total_cost * savings_rate),
        recommended_actions: actions.to_vec(),
    })
}
