use serde::Serialize;

/// A categorical optimization recommendation bundling every matching
/// resource, its estimated savings, and a fixed action list.
///
/// Serializes to `{type, resources, estimated_monthly_savings,
/// recommended_actions}` with `type` one of `idle_resources`,
/// `cost_spikes`, `tagging_gaps`. Each detector produces at most one of
/// these per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recommendation {
    IdleResources {
        resources: Vec<IdleResourceDetail>,
        estimated_monthly_savings: f64,
        recommended_actions: Vec<String>,
    },
    CostSpikes {
        resources: Vec<SpikeResourceDetail>,
        estimated_monthly_savings: f64,
        recommended_actions: Vec<String>,
    },
    TaggingGaps {
        resources: Vec<TaggingGapDetail>,
        estimated_monthly_savings: f64,
        recommended_actions: Vec<String>,
    },
}

impl Recommendation {
    pub fn kind(&self) -> &'static str {
        match self {
            Recommendation::IdleResources { .. } => "idle_resources",
            Recommendation::CostSpikes { .. } => "cost_spikes",
            Recommendation::TaggingGaps { .. } => "tagging_gaps",
        }
    }

    pub fn estimated_monthly_savings(&self) -> f64 {
        match self {
            Recommendation::IdleResources {
                estimated_monthly_savings,
                ..
            }
            | Recommendation::CostSpikes {
                estimated_monthly_savings,
                ..
            }
            | Recommendation::TaggingGaps {
                estimated_monthly_savings,
                ..
            } => *estimated_monthly_savings,
        }
    }
}

/// Resource detail for the idle detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleResourceDetail {
    pub resource_id: String,
    pub owner: String,
    pub environment: String,
    pub current_monthly_cost: f64,
    /// Mean utilization over the flagged rows, as a percentage rounded to
    /// one decimal.
    pub utilization: f64,
    pub potential_savings: f64,
}

/// Resource detail for the cost-spike detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeResourceDetail {
    pub resource_id: String,
    pub owner: String,
    pub environment: String,
    /// Human-readable percentage increase, e.g. `"100.0%"`.
    pub unit_cost_increase: String,
    /// The resource's cost in the globally latest month present in the
    /// data, not the flagged month's own cost.
    pub current_monthly_cost: f64,
    pub potential_savings: f64,
}

/// Tag presence for one dimension of a resource: `missing` when every
/// billing row for the resource lacks the tag, `partial` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    Missing,
    Partial,
}

/// Resource detail for the tagging-gap detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggingGapDetail {
    pub resource_id: String,
    pub owner_tag: TagStatus,
    pub environment_tag: TagStatus,
    pub monthly_unattributed_cost: f64,
    pub potential_savings: f64,
}

/// Merged output of all detectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationReport {
    pub total_estimated_monthly_savings: f64,
    pub recommendations: Vec<Recommendation>,
}
