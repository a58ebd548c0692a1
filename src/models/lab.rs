use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::enums::Classification;

/// One test value located in report text. `value` keeps the corrected decimal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResult {
    pub test_key: String,
    pub value: String,
    pub unit: String,
}

/// Extracted results of one document, in extraction order.
///
/// Holds at most one entry per test key: the first occurrence wins and later
/// insertions for the same key are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ExtractedResult>", into = "Vec<ExtractedResult>")]
pub struct ExtractionResults {
    entries: Vec<ExtractedResult>,
    keys: HashSet<String>,
}

impl ExtractionResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present. Returns whether the entry was stored.
    pub fn insert_if_absent(&mut self, result: ExtractedResult) -> bool {
        if self.keys.contains(&result.test_key) {
            return false;
        }
        self.keys.insert(result.test_key.clone());
        self.entries.push(result);
        true
    }

    pub fn contains(&self, test_key: &str) -> bool {
        self.keys.contains(test_key)
    }

    pub fn get(&self, test_key: &str) -> Option<&ExtractedResult> {
        self.entries.iter().find(|r| r.test_key == test_key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractedResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ExtractedResult>> for ExtractionResults {
    fn from(entries: Vec<ExtractedResult>) -> Self {
        let mut results = Self::new();
        for entry in entries {
            results.insert_if_absent(entry);
        }
        results
    }
}

impl From<ExtractionResults> for Vec<ExtractedResult> {
    fn from(results: ExtractionResults) -> Self {
        results.entries
    }
}

impl<'a> IntoIterator for &'a ExtractionResults {
    type Item = &'a ExtractedResult;
    type IntoIter = std::slice::Iter<'a, ExtractedResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A scored result: the measured value converted into the reference unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedFinding {
    pub test_key: String,
    pub value_converted: f64,
    pub unit: String,
    pub low: f64,
    pub high: f64,
    pub classification: Classification,
    pub advice: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(key: &str, value: &str) -> ExtractedResult {
        ExtractedResult {
            test_key: key.into(),
            value: value.into(),
            unit: "g/dl".into(),
        }
    }

    #[test]
    fn first_insert_wins() {
        let mut results = ExtractionResults::new();
        assert!(results.insert_if_absent(result("hemoglobin", "13.50")));
        assert!(!results.insert_if_absent(result("hemoglobin", "9.00")));
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("hemoglobin").unwrap().value, "13.50");
    }

    #[test]
    fn preserves_insertion_order() {
        let mut results = ExtractionResults::new();
        results.insert_if_absent(result("mchc", "34.00"));
        results.insert_if_absent(result("hemoglobin", "13.50"));
        results.insert_if_absent(result("mch", "29.00"));
        let keys: Vec<&str> = results.iter().map(|r| r.test_key.as_str()).collect();
        assert_eq!(keys, vec!["mchc", "hemoglobin", "mch"]);
    }

    #[test]
    fn serializes_as_ordered_list() {
        let mut results = ExtractionResults::new();
        results.insert_if_absent(result("mch", "29.00"));
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json[0]["test_key"], "mch");
        assert_eq!(json[0]["value"], "29.00");

        let back: ExtractionResults = serde_json::from_value(json).unwrap();
        assert!(back.contains("mch"));
    }
}
