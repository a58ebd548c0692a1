use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ExtractedResult, ExtractionResults};

use super::decimal::correct_with_range;
use super::lexicon::{Lexicon, LexiconError};
use super::medical_correction::correct_test_names;
use super::sanitize::clean_lines;

/// Lines probed after the test-name line when the value is not on the same line.
pub const VALUE_LOOKAHEAD_LINES: usize = 1;

/// A number with at most one decimal separator, then optional unit characters.
static VALUE_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+[.,]?\d*)\s*([a-zA-Z%/µμ²³\-]*)").expect("valid regex")
});

/// Extraction knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Fuzzy-correct OCR-misspelled test names before matching.
    pub fuzzy_terms: bool,
}

/// Extract test values from report text with the builtin lexicon and default options.
pub fn extract(text: &str) -> Result<ExtractionResults, LexiconError> {
    extract_with(text, &ExtractionOptions::default())
}

/// Extract test values from report text with the builtin lexicon.
pub fn extract_with(
    text: &str,
    options: &ExtractionOptions,
) -> Result<ExtractionResults, LexiconError> {
    let lexicon = Lexicon::builtin()?;
    if options.fuzzy_terms {
        Ok(extract_with_lexicon(lexicon, &correct_test_names(text)))
    } else {
        Ok(extract_with_lexicon(lexicon, text))
    }
}

/// Scan cleaned lines for test names and associate each with the nearest value.
///
/// Skip-lines are never scanned. The value is searched on the rest of the matching
/// line, then on the next line only. The first occurrence of a test wins.
pub fn extract_with_lexicon(lexicon: &Lexicon, text: &str) -> ExtractionResults {
    let mut results = ExtractionResults::new();
    let lines = clean_lines(text);

    for (i, line) in lines.iter().enumerate() {
        if lexicon.is_skip_line(line) {
            continue;
        }

        for m in lexicon.test_pattern().find_iter(line) {
            let Some(definition) = lexicon.lookup_name(m.as_str()) else {
                continue;
            };
            let key = &definition.normalized_key;
            if results.contains(key) {
                continue;
            }

            let found = find_value(&line[m.end()..]).or_else(|| {
                lines
                    .iter()
                    .skip(i + 1)
                    .take(VALUE_LOOKAHEAD_LINES)
                    .filter(|next| !lexicon.is_skip_line(next))
                    .find_map(|next| find_value(next))
            });

            match found {
                Some((raw_value, unit)) => {
                    let value = correct_with_range(definition.expected_range, raw_value);
                    tracing::debug!(test_key = %key, value = %value, unit, "Extracted test value");
                    results.insert_if_absent(ExtractedResult {
                        test_key: key.clone(),
                        value,
                        unit: unit.to_string(),
                    });
                }
                None => {
                    tracing::debug!(test_key = %key, line = i, "Test name without value, dropped");
                }
            }
        }
    }

    if results.is_empty() {
        tracing::warn!("No results extracted. Check OCR quality.");
    }

    results
}

/// First `<number><unit>` token in `text`, unit trimmed.
fn find_value(text: &str) -> Option<(&str, &str)> {
    let caps = VALUE_UNIT_RE.captures(text)?;
    let value = caps.get(1)?.as_str();
    let unit = caps.get(2).map_or("", |u| u.as_str().trim());
    Some((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> ExtractionResults {
        extract(text).unwrap()
    }

    #[test]
    fn extracts_value_and_unit_on_same_line() {
        let results = run("Hemoglobin 13.5 g/dL\nMCH 29 pg");
        let hb = results.get("hemoglobin").unwrap();
        assert_eq!(hb.value, "13.50");
        assert_eq!(hb.unit, "g/dl");
        let mch = results.get("mch").unwrap();
        assert_eq!(mch.value, "29.00");
        assert_eq!(mch.unit, "pg");
    }

    #[test]
    fn multi_word_names_use_normalized_keys() {
        let results = run("Red Blood Cell: 4.8 million/ul\nTroponin-I 0,02 ng/ml");
        assert_eq!(results.get("redbloodcell").unwrap().value, "4.80");
        let trop = results.get("troponini").unwrap();
        assert_eq!(trop.value, "0.02");
        assert_eq!(trop.unit, "ng/ml");
    }

    #[test]
    fn skip_line_is_never_matched() {
        let results = run("Hemoglobin reference range 13.2 16.6 g/dl");
        assert!(results.is_empty());
    }

    #[test]
    fn header_rows_do_not_hide_data_rows() {
        let text = "Test Result Unit Reference Range\nHemoglobin 14.1 g/dl 13.2-16.6";
        let results = run(text);
        assert_eq!(results.get("hemoglobin").unwrap().value, "14.10");
    }

    #[test]
    fn value_taken_from_next_line() {
        let results = run("Ferritin\n85 ng/ml");
        let ferritin = results.get("ferritin").unwrap();
        assert_eq!(ferritin.value, "85.00");
        assert_eq!(ferritin.unit, "ng/ml");
    }

    #[test]
    fn value_two_lines_away_is_not_found() {
        let results = run("Ferritin\nsee below\n85 ng/ml");
        assert!(!results.contains("ferritin"));
    }

    #[test]
    fn next_line_skip_line_is_not_probed() {
        let results = run("Ferritin\nNormal 30-400 ng/ml");
        assert!(!results.contains("ferritin"));
    }

    #[test]
    fn first_occurrence_wins() {
        let results = run("Glucose 92 mg/dl\nGlucose 180 mg/dl");
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("glucose").unwrap().value, "92.00");
    }

    #[test]
    fn several_tests_on_one_line() {
        let results = run("MCH 29 pg MCHC 34 g/dl");
        assert_eq!(results.get("mch").unwrap().value, "29.00");
        assert_eq!(results.get("mchc").unwrap().value, "34.00");
        let keys: Vec<&str> = results.iter().map(|r| r.test_key.as_str()).collect();
        assert_eq!(keys, vec!["mch", "mchc"]);
    }

    #[test]
    fn decimal_correction_applied() {
        let results = run("Hemoglobin 1350 g/dl");
        assert_eq!(results.get("hemoglobin").unwrap().value, "13.50");
    }

    #[test]
    fn missing_unit_gives_empty_unit() {
        let results = run("Hemoglobin 14.2");
        let hb = results.get("hemoglobin").unwrap();
        assert_eq!(hb.value, "14.20");
        assert_eq!(hb.unit, "");
    }

    #[test]
    fn micro_sign_and_percent_units() {
        let results = run("Serum Iron 18 µmol/L\nHbA1c 5.6 %");
        assert_eq!(results.get("serumiron").unwrap().unit, "µmol/l");
        assert_eq!(results.get("hba1c").unwrap().unit, "%");
    }

    #[test]
    fn no_recognized_tests_gives_empty_results() {
        assert!(run("Patient: John Doe\nDate: 2024-01-01").is_empty());
        assert!(run("").is_empty());
    }

    #[test]
    fn fuzzy_terms_recover_misspelled_names() {
        let options = ExtractionOptions { fuzzy_terms: true };
        let results = extract_with("Hemoglobln 13.1 g/dl", &options).unwrap();
        assert_eq!(results.get("hemoglobin").unwrap().value, "13.10");

        let plain = extract("Hemoglobln 13.1 g/dl").unwrap();
        assert!(plain.is_empty());
    }

    #[test]
    fn synthetic_report_round_trip() {
        let triples = [
            ("Hemoglobin", 13.8, "g/dl"),
            ("Platelets", 245.0, "k/ul"),
            ("Fasting Plasma Glucose", 91.5, "mg/dl"),
            ("Serum Creatinine", 0.92, "mg/dl"),
            ("TSH", 2.4, "miu/l"),
            ("Ferritin", 120.0, "ng/ml"),
            ("MCHC", 33.7, "g/dl"),
        ];
        let text: String = triples
            .iter()
            .map(|(name, value, unit)| format!("{name}   {value} {unit}\n"))
            .collect();

        let results = run(&text);
        assert_eq!(results.len(), triples.len());
        for (name, value, unit) in triples {
            let key = super::super::lexicon::normalize_key(name);
            let found = results.get(&key).unwrap_or_else(|| panic!("missing {key}"));
            let parsed: f64 = found.value.parse().unwrap();
            assert!((parsed - value).abs() < 0.005, "{key}: {parsed} vs {value}");
            assert_eq!(found.unit, unit);
        }
    }
}
