use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Tunables for the recommendation detectors.
///
/// Savings multipliers and action texts live here rather than inside the
/// detection logic so they can be adjusted and tested independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    #[serde(default)]
    pub idle: IdleDetectorConfig,

    #[serde(default)]
    pub spikes: SpikeDetectorConfig,

    #[serde(default)]
    pub tagging: TaggingDetectorConfig,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rate) in [
            ("detectors.idle.savings_rate", self.idle.savings_rate),
            ("detectors.spikes.recovery_rate", self.spikes.recovery_rate),
            ("detectors.tagging.savings_rate", self.tagging.savings_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be between 0.0 and 1.0, got {rate}"
                )));
            }
        }
        if self.idle.usage_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "detectors.idle.usage_threshold cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Idle-resource detection: low utilization despite cost above a floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdleDetectorConfig {
    /// Utilization below this fraction of the cohort peak counts as idle.
    #[serde(default = "default_usage_threshold")]
    pub usage_threshold: f64,

    /// Monthly cost floor; cheaper rows are never flagged.
    #[serde(default = "default_cost_threshold")]
    pub cost_threshold: f64,

    /// Fraction of the flagged cost assumed recoverable by terminating or
    /// right-sizing.
    #[serde(default = "default_idle_savings_rate")]
    pub savings_rate: f64,

    /// Action texts attached to every idle recommendation.
    #[serde(default = "default_idle_actions")]
    pub actions: Vec<String>,
}

impl Default for IdleDetectorConfig {
    fn default() -> Self {
        Self {
            usage_threshold: default_usage_threshold(),
            cost_threshold: default_cost_threshold(),
            savings_rate: default_idle_savings_rate(),
            actions: default_idle_actions(),
        }
    }
}

/// Cost-spike detection: month-over-month unit price increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpikeDetectorConfig {
    /// Minimum fractional unit-cost increase to flag. Increases only;
    /// price drops are never flagged.
    #[serde(default = "default_spike_threshold")]
    pub threshold_pct: f64,

    /// Fraction of the spike-attributed cost assumed recoverable.
    #[serde(default = "default_spike_recovery_rate")]
    pub recovery_rate: f64,

    #[serde(default = "default_spike_actions")]
    pub actions: Vec<String>,
}

impl Default for SpikeDetectorConfig {
    fn default() -> Self {
        Self {
            threshold_pct: default_spike_threshold(),
            recovery_rate: default_spike_recovery_rate(),
            actions: default_spike_actions(),
        }
    }
}

/// Tagging-gap detection: cost with missing owner/env attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaggingDetectorConfig {
    /// Fraction of unattributed cost assumed recoverable through better
    /// allocation.
    #[serde(default = "default_tagging_savings_rate")]
    pub savings_rate: f64,

    #[serde(default = "default_tagging_actions")]
    pub actions: Vec<String>,
}

impl Default for TaggingDetectorConfig {
    fn default() -> Self {
        Self {
            savings_rate: default_tagging_savings_rate(),
            actions: default_tagging_actions(),
        }
    }
}

fn default_usage_threshold() -> f64 {
    0.1
}

fn default_cost_threshold() -> f64 {
    100.0
}

fn default_idle_savings_rate() -> f64 {
    0.7
}

fn default_spike_threshold() -> f64 {
    0.3
}

fn default_spike_recovery_rate() -> f64 {
    0.5
}

fn default_tagging_savings_rate() -> f64 {
    0.2
}

fn default_idle_actions() -> Vec<String> {
    [
        "Review and terminate resources with 0% utilization",
        "Right-size resources with low utilization",
        "Implement auto-scaling where applicable",
        "Enable automated start/stop schedules for non-production resources",
    ]
    .map(String::from)
    .to_vec()
}

fn default_spike_actions() -> Vec<String> {
    [
        "Investigate recent configuration changes",
        "Review resource pricing tier changes",
        "Check for unexpected usage patterns",
        "Consider moving to reserved instances or savings plans",
        "Evaluate alternative service options",
    ]
    .map(String::from)
    .to_vec()
}

fn default_tagging_actions() -> Vec<String> {
    [
        "Implement mandatory tagging policy",
        "Add missing owner tags",
        "Add missing environment tags",
        "Set up automated tag compliance checks",
        "Create tag inheritance rules where applicable",
    ]
    .map(String::from)
    .to_vec()
}
