use psyrun_core::{BlockSpec, Record};
use serde::{Deserialize, Serialize};

/// Session-level parameters: the block layout plus ambient fields stamped
/// into every saved trial record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_name: String,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
    /// Merged into every saved record; trial fields win on key collisions.
    #[serde(default)]
    pub base_record: Record,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            experiment_name: "experiment".into(),
            blocks: Vec::new(),
            base_record: Record::new(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
