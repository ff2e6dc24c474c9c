use std::{collections::HashMap, sync::Arc};

use crate::{
    db::DbPool,
    models::{BillingRow, EnrichedRecord, EnrichmentReport, ResourceRow, UNASSIGNED},
    services::error::{ServiceError, ServiceResult},
};

/// How raw numeric columns are turned into numbers.
///
/// The engine is advisory analytics, not financial reconciliation, so the
/// default is deliberately forgiving. The policy is named so a strict mode
/// can be added later without changing call sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Non-parseable values silently become 0.0.
    #[default]
    Lenient,
}

impl CoercionPolicy {
    /// Coerce a raw column value to a number.
    pub fn coerce(self, raw: Option<&str>) -> f64 {
        match self {
            CoercionPolicy::Lenient => {
                let parsed = raw.map(str::trim).and_then(|s| s.parse::<f64>().ok());
                match parsed {
                    // "nan" parses to f64::NAN; fold it into the default
                    // like any other unusable value.
                    Some(v) if !v.is_nan() => v,
                    _ => 0.0,
                }
            }
        }
    }
}

/// Normalize a resource identifier: trim whitespace, treat empty strings
/// and the literal `"nan"` as null. The latter guards against upstream
/// numeric-type corruption of ID columns.
pub(crate) fn normalize_resource_id(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed == "nan" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Left-join billing rows to resource metadata.
///
/// Every billing row yields exactly one enriched record. A `resource_id`
/// appearing more than once in the metadata would make the join
/// one-to-many, which is a hard [`ServiceError::DataIntegrity`] error.
/// Missing owner/env become [`UNASSIGNED`].
pub fn enrich_rows(
    billing: &[BillingRow],
    resources: &[ResourceRow],
    policy: CoercionPolicy,
) -> ServiceResult<Vec<EnrichedRecord>> {
    let mut by_id: HashMap<String, &ResourceRow> = HashMap::with_capacity(resources.len());
    for res in resources {
        let Some(id) = normalize_resource_id(Some(&res.resource_id)) else {
            tracing::debug!("Skipping resource metadata row with null resource_id");
            continue;
        };
        if by_id.insert(id.clone(), res).is_some() {
            return Err(ServiceError::DataIntegrity(format!(
                "resource_id '{id}' appears more than once in resource metadata; \
                 the billing join must be many-to-one"
            )));
        }
    }

    let enriched = billing
        .iter()
        .map(|row| {
            let resource_id = normalize_resource_id(row.resource_id.as_deref());
            let metadata = resource_id.as_deref().and_then(|id| by_id.get(id));

            let owner = metadata
                .and_then(|m| m.owner.clone())
                .unwrap_or_else(|| UNASSIGNED.to_string());
            let env = metadata
                .and_then(|m| m.env.clone())
                .unwrap_or_else(|| UNASSIGNED.to_string());

            EnrichedRecord {
                invoice_month: row.invoice_month.clone(),
                account_id: row.account_id.clone(),
                subscription: row.subscription.clone(),
                service: row.service.clone(),
                resource_group: row.resource_group.clone(),
                resource_id,
                region: row.region.clone(),
                usage_qty: policy.coerce(row.usage_qty.as_deref()),
                unit_cost: policy.coerce(row.unit_cost.as_deref()),
                cost: policy.coerce(row.cost.as_deref()),
                owner,
                env,
                tags_json: metadata.and_then(|m| m.tags_json.clone()),
            }
        })
        .collect();

    Ok(enriched)
}

/// Joins billing rows to resource metadata, producing the enriched view
/// every KPI query and detector consumes.
///
/// Pure over its two input tables: no side effects, recomputed fresh on
/// every call.
#[derive(Clone)]
pub struct EnrichmentService {
    db: Arc<DbPool>,
    policy: CoercionPolicy,
}

impl EnrichmentService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            db,
            policy: CoercionPolicy::Lenient,
        }
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    /// Read both tables. A missing/unreadable billing table is fatal; an
    /// unreadable resources table degrades to an empty metadata set so
    /// every record lands in the unassigned bucket.
    pub async fn load_tables(&self) -> ServiceResult<(Vec<BillingRow>, Vec<ResourceRow>)> {
        let billing = self.db.billing().fetch_all().await.map_err(|e| {
            ServiceError::MissingData(format!(
                "could not read billing table, ensure billing was ingested: {e}"
            ))
        })?;

        let resources = match self.db.resources().fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Could not read resources table, treating as empty: {e}");
                Vec::new()
            }
        };

        Ok((billing, resources))
    }

    /// Produce the enriched record set.
    pub async fn enrich(&self) -> ServiceResult<Vec<EnrichedRecord>> {
        let (billing, resources) = self.load_tables().await?;
        enrich_rows(&billing, &resources, self.policy)
    }

    /// Sanity-check counts and cost conservation across the join.
    pub async fn report(&self) -> ServiceResult<EnrichmentReport> {
        let (billing, resources) = self.load_tables().await?;
        let enriched = enrich_rows(&billing, &resources, self.policy)?;

        let total_before: f64 = billing
            .iter()
            .map(|r| self.policy.coerce(r.cost.as_deref()))
            .sum();
        let total_after: f64 = enriched.iter().map(|r| r.cost).sum();

        Ok(EnrichmentReport {
            billing_rows: billing.len(),
            resource_rows: resources.len(),
            enriched_rows: enriched.len(),
            total_cost_before: total_before,
            total_cost_after: total_after,
        })
    }
}
