//! Configuration for the cost analytics engine.
//!
//! Configured via a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "sqlite"
//! path = "data/billing.db"
//!
//! [detectors.idle]
//! cost_threshold = 250.0
//! ```

mod database;
mod detectors;
mod observability;
mod snapshots;

use std::path::Path;

pub use database::*;
pub use detectors::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use snapshots::*;
use thiserror::Error;

/// Root configuration. All sections are optional with sensible defaults,
/// so an empty file is a valid single-node setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopilotConfig {
    /// Billing store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Recommendation detector thresholds, savings rates, and action texts.
    #[serde(default)]
    pub detectors: DetectorConfig,

    /// Per-month KPI snapshot cache.
    #[serde(default)]
    pub snapshots: SnapshotConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl CopilotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: CopilotConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.detectors.validate()?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR_NAME}` references outside of comments.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let match_start = cap.get(0).unwrap().start();

            // Variables inside a comment are left alone
            if let Some(pos) = comment_pos
                && match_start >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..match_start]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = cap.get(0).unwrap().end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CopilotConfig::from_toml("").unwrap();
        assert!(matches!(config.database, DatabaseConfig::Sqlite(_)));
        assert_eq!(config.detectors.idle.savings_rate, 0.7);
        assert_eq!(config.detectors.spikes.recovery_rate, 0.5);
        assert_eq!(config.detectors.tagging.savings_rate, 0.2);
    }

    #[test]
    fn env_vars_are_expanded() {
        // Safety: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("COSTPILOT_TEST_DB_PATH", "/tmp/test.db") };
        let config = CopilotConfig::from_toml(
            "[database]\ntype = \"sqlite\"\npath = \"${COSTPILOT_TEST_DB_PATH}\"\n",
        )
        .unwrap();
        match config.database {
            DatabaseConfig::Sqlite(cfg) => assert_eq!(cfg.path, "/tmp/test.db"),
            other => panic!("unexpected database config: {other:?}"),
        }
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let err = CopilotConfig::from_toml(
            "[database]\ntype = \"sqlite\"\npath = \"${COSTPILOT_DOES_NOT_EXIST}\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(_)));
    }

    #[test]
    fn env_vars_in_comments_are_ignored() {
        let config =
            CopilotConfig::from_toml("# path could be ${COSTPILOT_DOES_NOT_EXIST}\n").unwrap();
        assert!(matches!(config.database, DatabaseConfig::Sqlite(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(CopilotConfig::from_toml("[not_a_section]\nx = 1\n").is_err());
    }

    #[test]
    fn invalid_savings_rate_fails_validation() {
        let err = CopilotConfig::from_toml("[detectors.idle]\nsavings_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
