//! Recognized blood-test names, skip-words, and decimal sanity windows.
//!
//! Everything here is built once per process and never mutated afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Test names as they appear on reports, lowercase.
///
/// Order matters: the matcher is a leftmost-first alternation, so when two names
/// start at the same position the earlier entry is tried first.
const BLOOD_TESTS: &[&str] = &[
    "hemoglobin", "hb", "hgb", "hematocrit", "hct", "rbc", "red blood cell",
    "wbc", "white blood cell", "platelet", "platelets", "neutrophils",
    "lymphocytes", "eosinophils", "monocytes", "basophils", "fasting plasma glucose",
    "2-hour postprandial glucose", "glucose", "hba1c", "total cholesterol",
    "ldl cholesterol", "hdl cholesterol", "triglycerides", "total bilirubin",
    "alt", "sgpt", "ast", "sgot", "alp", "albumin", "serum creatinine",
    "creatinine", "bun", "blood urea nitrogen", "egfr", "sodium", "tsh",
    "free t4", "total t3", "serum iron", "iron", "ferritin", "tibc",
    "troponin-i", "ck-mb", "bnp", "crp", "esr", "pt", "inr", "aptt", "mch", "mchc",
];

/// Words marking a line as a table header or legend rather than data.
const SKIP_WORDS: &[&str] = &[
    "reference", "range", "unit", "normal", "interval", "ref.",
    "biological", "test", "parameter", "result", "value",
];

/// Plausible magnitudes used to repair dropped decimal points.
const EXPECTED_RANGES: &[(&str, (f64, f64))] = &[
    ("mch", (10.0, 50.0)),       // pg
    ("mchc", (20.0, 45.0)),      // g/dL or %
    ("hemoglobin", (5.0, 20.0)), // g/dL
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexiconError {
    #[error("Test names '{first}' and '{second}' both normalize to key '{key}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },

    #[error("Test name '{0}' normalizes to an empty key")]
    EmptyKey(String),

    #[error("Expected range references unknown test key '{0}'")]
    UnknownRangeKey(String),

    #[error("Pattern compilation failed: {0}")]
    Pattern(#[from] regex::Error),
}

/// One recognized test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDefinition {
    pub display_name: String,
    pub normalized_key: String,
    pub expected_range: Option<(f64, f64)>,
}

/// Compiled lexicon: definitions plus the matchers derived from them.
#[derive(Debug)]
pub struct Lexicon {
    definitions: Vec<TestDefinition>,
    by_name: HashMap<String, usize>,
    test_pattern: Regex,
    skip_pattern: Regex,
}

/// Lowercase alphanumeric folding of a display name.
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

fn alternation(words: &[&str]) -> String {
    let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    format!(r"\b({})\b", escaped.join("|"))
}

impl Lexicon {
    /// Build a lexicon, rejecting key collisions and dangling expected ranges.
    pub fn build(
        names: &[&str],
        skip_words: &[&str],
        expected_ranges: &[(&str, (f64, f64))],
    ) -> Result<Self, LexiconError> {
        let mut definitions = Vec::with_capacity(names.len());
        let mut by_name = HashMap::with_capacity(names.len());
        let mut by_key: HashMap<String, String> = HashMap::with_capacity(names.len());

        for name in names {
            let display_name = name.trim().to_lowercase();
            let key = normalize_key(&display_name);
            if key.is_empty() {
                return Err(LexiconError::EmptyKey(display_name));
            }
            if let Some(first) = by_key.get(&key) {
                return Err(LexiconError::KeyCollision {
                    key,
                    first: first.clone(),
                    second: display_name,
                });
            }
            by_key.insert(key.clone(), display_name.clone());

            let expected_range = expected_ranges
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, range)| *range);

            by_name.insert(display_name.clone(), definitions.len());
            definitions.push(TestDefinition {
                display_name,
                normalized_key: key,
                expected_range,
            });
        }

        for (key, _) in expected_ranges {
            if !by_key.contains_key(*key) {
                return Err(LexiconError::UnknownRangeKey((*key).to_string()));
            }
        }

        let lowered: Vec<&str> = definitions.iter().map(|d| d.display_name.as_str()).collect();
        let test_pattern = Regex::new(&alternation(&lowered))?;
        let skip_pattern = Regex::new(&alternation(skip_words))?;

        Ok(Self {
            definitions,
            by_name,
            test_pattern,
            skip_pattern,
        })
    }

    /// The compiled-in blood-test lexicon.
    pub fn builtin() -> Result<&'static Lexicon, LexiconError> {
        static BUILTIN: LazyLock<Result<Lexicon, LexiconError>> =
            LazyLock::new(|| Lexicon::build(BLOOD_TESTS, SKIP_WORDS, EXPECTED_RANGES));
        BUILTIN.as_ref().map_err(Clone::clone)
    }

    /// True when the (cleaned, lowercase) line is a header or legend line.
    pub fn is_skip_line(&self, line: &str) -> bool {
        self.skip_pattern.is_match(line)
    }

    /// Whole-word test-name matcher over cleaned lowercase lines.
    pub fn test_pattern(&self) -> &Regex {
        &self.test_pattern
    }

    /// Definition for a matched display name.
    pub fn lookup_name(&self, name: &str) -> Option<&TestDefinition> {
        self.by_name.get(name).map(|&i| &self.definitions[i])
    }

    /// Definition for a normalized key.
    pub fn lookup_key(&self, key: &str) -> Option<&TestDefinition> {
        self.definitions.iter().find(|d| d.normalized_key == key)
    }

    pub fn expected_range(&self, key: &str) -> Option<(f64, f64)> {
        self.lookup_key(key).and_then(|d| d.expected_range)
    }

    pub fn definitions(&self) -> &[TestDefinition] {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_builds() {
        let lexicon = Lexicon::builtin().unwrap();
        assert_eq!(lexicon.definitions().len(), BLOOD_TESTS.len());
    }

    #[test]
    fn keys_are_unique_and_alphanumeric() {
        let lexicon = Lexicon::builtin().unwrap();
        let mut seen = HashSet::new();
        for def in lexicon.definitions() {
            assert!(def
                .normalized_key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            assert!(seen.insert(def.normalized_key.clone()), "duplicate {}", def.normalized_key);
        }
    }

    #[test]
    fn normalize_key_folds_punctuation_and_spaces() {
        assert_eq!(normalize_key("Red Blood Cell"), "redbloodcell");
        assert_eq!(normalize_key("troponin-i"), "troponini");
        assert_eq!(normalize_key("2-hour postprandial glucose"), "2hourpostprandialglucose");
    }

    #[test]
    fn collision_is_rejected() {
        let err = Lexicon::build(&["ck-mb", "ckmb"], SKIP_WORDS, &[]).unwrap_err();
        assert!(matches!(err, LexiconError::KeyCollision { ref key, .. } if key == "ckmb"));
    }

    #[test]
    fn dangling_expected_range_is_rejected() {
        let err = Lexicon::build(&["hb"], SKIP_WORDS, &[("mch", (10.0, 50.0))]).unwrap_err();
        assert_eq!(err, LexiconError::UnknownRangeKey("mch".into()));
    }

    #[test]
    fn expected_ranges_attached() {
        let lexicon = Lexicon::builtin().unwrap();
        assert_eq!(lexicon.expected_range("hemoglobin"), Some((5.0, 20.0)));
        assert_eq!(lexicon.expected_range("mch"), Some((10.0, 50.0)));
        assert_eq!(lexicon.expected_range("glucose"), None);
        assert_eq!(lexicon.expected_range("nonexistent"), None);
    }

    #[test]
    fn skip_words_match_whole_words_only() {
        let lexicon = Lexicon::builtin().unwrap();
        assert!(lexicon.is_skip_line("test name result unit"));
        assert!(lexicon.is_skip_line("reference range 13.2 - 16.6"));
        assert!(!lexicon.is_skip_line("hemoglobin 13.5 g/dl"));
        // "units" and "ranges" are not the skip-words themselves
        assert!(!lexicon.is_skip_line("ranges units"));
    }

    #[test]
    fn test_pattern_prefers_longer_name_at_same_position() {
        let lexicon = Lexicon::builtin().unwrap();
        let found: Vec<&str> = lexicon
            .test_pattern()
            .find_iter("platelets 250 fasting plasma glucose 90")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["platelets", "fasting plasma glucose"]);
    }

    #[test]
    fn test_pattern_respects_word_boundaries() {
        let lexicon = Lexicon::builtin().unwrap();
        let found: Vec<&str> = lexicon
            .test_pattern()
            .find_iter("hba1c 5.6 % alternative")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["hba1c"]);
    }
}
