use serde::Serialize;

/// One group's summed cost for a single month (owner or env breakdown).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCost {
    pub group: String,
    pub cost: f64,
}

/// Fraction of a month's cost attributable to a known owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerCoverage {
    pub month: String,
    pub total_cost: f64,
    pub assigned_cost: f64,
    /// `assigned_cost / total_cost`, defined as 0.0 for an empty month.
    /// Rounded to 4 decimals.
    pub coverage_pct: f64,
}

/// Grouping dimension for trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Owner,
    Env,
}

impl GroupBy {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupBy::Owner => "owner",
            GroupBy::Env => "env",
        }
    }
}

/// Month-indexed cost pivot: one row per month (ascending), one column per
/// group value (ascending), absent combinations filled with 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendTable {
    pub months: Vec<String>,
    pub groups: Vec<String>,
    /// `values[m][g]` is the cost for `months[m]` / `groups[g]`.
    pub values: Vec<Vec<f64>>,
}

impl TrendTable {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// One ranked entry from the top-N cost driver query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostDriver {
    pub resource_id: Option<String>,
    pub service: Option<String>,
    pub resource_group: Option<String>,
    pub owner: String,
    pub cost: f64,
}

/// A resource-month whose mean unit cost moved by at least the requested
/// threshold against the previous month present for that resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitCostChange {
    pub resource_id: String,
    pub invoice_month: String,
    pub unit_cost: f64,
    pub prev_unit_cost: f64,
    /// Signed fractional change, rounded to 4 decimals.
    pub pct_change: f64,
}

/// Counts reported by the enrichment sanity check.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub billing_rows: usize,
    pub resource_rows: usize,
    pub enriched_rows: usize,
    pub total_cost_before: f64,
    pub total_cost_after: f64,
}
