//! Flat key-value records exchanged with the persistence collaborator.

use serde_json::Value;

/// A trial record as handed to storage: plain string keys, JSON values.
pub type Record = serde_json::Map<String, Value>;

/// Overlays `overrides` onto a copy of `base` and returns the merged record.
///
/// `Value::clone` is deep, so the result shares no nested arrays or objects
/// with either input. Keys present in both take the value from `overrides`.
pub fn merge_records(base: &Record, overrides: &Record) -> Record {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn overrides_win_on_shared_keys() {
        let base = record(&[("a", json!(1)), ("b", json!("keep"))]);
        let over = record(&[("a", json!(2))]);
        let merged = merge_records(&base, &over);
        assert_eq!(merged["a"], json!(2));
        assert_eq!(merged["b"], json!("keep"));
    }

    #[test]
    fn merged_record_does_not_alias_nested_values() {
        let base = record(&[("pos", json!([1, 2, 3]))]);
        let mut merged = merge_records(&base, &Record::new());
        merged["pos"][0] = json!(99);
        assert_eq!(base["pos"], json!([1, 2, 3]));
    }

    #[test]
    fn inputs_are_untouched() {
        let base = record(&[("x", json!(0))]);
        let over = record(&[("y", json!(1))]);
        let merged = merge_records(&base, &over);
        assert_eq!(merged.len(), 2);
        assert_eq!(base.len(), 1);
        assert_eq!(over.len(), 1);
    }
}
