use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declarative input to sequencing: named variable arrays plus repetition and
/// shuffle options. Every variable array in a block must have the same length;
/// sequencing rejects ragged blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub name: String,
    /// Variable name to the ordered values it takes, one per condition.
    #[serde(default)]
    pub variables: BTreeMap<String, Vec<Value>>,
    /// Passes through the block's conditions.
    pub repetitions: usize,
    /// Draw a fresh uniform permutation of the conditions per repetition.
    /// When false the original order is reproduced exactly.
    #[serde(default)]
    pub shuffle: bool,
}

impl BlockSpec {
    pub fn new(name: impl Into<String>, repetitions: usize, shuffle: bool) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
            repetitions,
            shuffle,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.variables.insert(name.into(), values);
        self
    }

    /// Number of conditions, taken from the first variable. Zero when the
    /// block declares no variables.
    pub fn num_conditions(&self) -> usize {
        self.variables
            .values()
            .next()
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn num_conditions_reads_first_variable() {
        let block = BlockSpec::new("main", 2, false)
            .with_variable("dir", vec![json!(-1), json!(1)])
            .with_variable("speed", vec![json!(0.5), json!(1.5)]);
        assert_eq!(block.num_conditions(), 2);
    }

    #[test]
    fn empty_block_has_zero_conditions() {
        assert_eq!(BlockSpec::new("empty", 3, true).num_conditions(), 0);
    }

    #[test]
    fn round_trips_through_json() {
        let block = BlockSpec::new("probe", 1, true)
            .with_variable("delay_ms", vec![json!(100), json!(400)]);
        let text = serde_json::to_string(&block).unwrap();
        let back: BlockSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(back, block);
    }
}
