use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-month KPI snapshot cache configuration.
///
/// Snapshots are written only when the caller asks for them and are never
/// invalidated by a background process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Directory holding one subdirectory per cached month.
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: default_snapshot_dir(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("data/cache")
}
