use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One row of the experiment: the variable values drawn for this trial plus
/// sequencing bookkeeping. Built in bulk before the session starts and never
/// mutated afterwards; measured results are merged in at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Name of the block this trial was drawn from.
    pub block_name: String,
    /// Ordinal of the block among all blocks sequenced, shared by every
    /// repetition of the block.
    pub block_index: usize,
    /// Ordinal of the repetition across the whole sequence, never reset
    /// per block.
    pub cycle_index: usize,
    /// Variable name to the value drawn for this trial.
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl Trial {
    /// Value drawn for `variable`, if the block declared it.
    pub fn value(&self, variable: &str) -> Option<&Value> {
        self.values.get(variable)
    }

    /// Flattens the trial into a storage record: bookkeeping fields first,
    /// then the drawn variables.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("block_name".into(), Value::from(self.block_name.clone()));
        record.insert("block_index".into(), Value::from(self.block_index));
        record.insert("cycle_index".into(), Value::from(self.cycle_index));
        for (variable, value) in &self.values {
            record.insert(variable.clone(), value.clone());
        }
        record
    }
}
