use serde::{Deserialize, Serialize};

/// Sentinel owner/env value for billing rows with no resource metadata.
pub const UNASSIGNED: &str = "unassigned";

/// A billing line item exactly as it sits in the store.
///
/// Numeric columns stay as raw strings here; coercion to numbers is an
/// analysis-time policy (see [`crate::services::CoercionPolicy`]), so a
/// malformed source value survives ingestion and can be inspected later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingRow {
    /// Invoice period in `YYYY-MM` form.
    pub invoice_month: String,
    pub account_id: Option<String>,
    pub subscription: Option<String>,
    pub service: Option<String>,
    pub resource_group: Option<String>,
    pub resource_id: Option<String>,
    pub region: Option<String>,
    pub usage_qty: Option<String>,
    pub unit_cost: Option<String>,
    pub cost: Option<String>,
}

/// Ownership metadata for a single resource. At most one row per
/// `resource_id`; a duplicate is a data-integrity violation surfaced by
/// enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRow {
    pub resource_id: String,
    pub owner: Option<String>,
    pub env: Option<String>,
    /// Opaque tag map, serialized as JSON by whatever seeded the table.
    pub tags_json: Option<String>,
}

/// A billing row left-joined to its resource metadata, with numeric
/// columns coerced and missing owner/env filled with [`UNASSIGNED`].
///
/// Derived and ephemeral: recomputed on every query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub invoice_month: String,
    pub account_id: Option<String>,
    pub subscription: Option<String>,
    pub service: Option<String>,
    pub resource_group: Option<String>,
    pub resource_id: Option<String>,
    pub region: Option<String>,
    pub usage_qty: f64,
    pub unit_cost: f64,
    pub cost: f64,
    pub owner: String,
    pub env: String,
    pub tags_json: Option<String>,
}

impl EnrichedRecord {
    /// Whether cost for this row can be attributed to a known owner.
    pub fn is_assigned(&self) -> bool {
        self.owner != UNASSIGNED
    }
}
