//! Post-OCR test-name correction.
//!
//! Applies fuzzy matching against the single-word names of the lexicon to fix common
//! OCR errors ("Hemoglobln", "Creatiniue"). Only corrects when the match is
//! unambiguous, within edit distance 2, and the word is at least 5 characters long.

use std::sync::LazyLock;

use super::lexicon::Lexicon;

const MIN_WORD_LEN: usize = 5;
const MAX_DISTANCE: u32 = 2;

/// Lexicon words eligible as correction targets, sorted for binary search.
static CORRECTION_TERMS: LazyLock<Vec<String>> = LazyLock::new(|| {
    let mut terms: Vec<String> = Lexicon::builtin()
        .map(|lexicon| {
            lexicon
                .definitions()
                .iter()
                .flat_map(|d| d.display_name.split(|c: char| !c.is_alphanumeric()))
                .filter(|w| w.chars().count() >= MIN_WORD_LEN)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    terms.sort();
    terms.dedup();
    terms
});

/// Apply test-name correction to report text. Non-word characters pass through.
pub fn correct_test_names(text: &str) -> String {
    correct_with_terms(text, &CORRECTION_TERMS)
}

fn correct_with_terms(text: &str, terms: &[String]) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word_buf = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word_buf.push(ch);
        } else {
            if !word_buf.is_empty() {
                result.push_str(&try_correct_word(&word_buf, terms));
                word_buf.clear();
            }
            result.push(ch);
        }
    }

    if !word_buf.is_empty() {
        result.push_str(&try_correct_word(&word_buf, terms));
    }

    result
}

/// Try to correct a single word against the term list.
fn try_correct_word(word: &str, terms: &[String]) -> String {
    let len = word.chars().count();
    if len < MIN_WORD_LEN || word.chars().any(|c| c.is_numeric()) {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    if terms.binary_search(&lower).is_ok() {
        return word.to_string();
    }

    let mut best_term: Option<&str> = None;
    let mut best_distance = MAX_DISTANCE + 1;
    let mut ambiguous = false;

    for term in terms {
        let len_diff = (len as i64 - term.chars().count() as i64).unsigned_abs();
        if len_diff > u64::from(MAX_DISTANCE) {
            continue;
        }

        let dist = edit_distance(&lower, term);
        if dist < best_distance {
            best_distance = dist;
            best_term = Some(term);
            ambiguous = false;
        } else if dist == best_distance && best_term.is_some() {
            ambiguous = true;
        }
    }

    match best_term {
        Some(term) if !ambiguous => {
            tracing::debug!(from = %lower, to = term, "Corrected OCR test name");
            preserve_case(word, term)
        }
        _ => word.to_string(),
    }
}

/// Keep the original capitalization pattern when applying a correction.
fn preserve_case(original: &str, correction: &str) -> String {
    if original.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
        return correction.to_uppercase();
    }

    let first_upper = original.chars().next().is_some_and(char::is_uppercase);
    if first_upper {
        let mut chars = correction.chars();
        match chars.next() {
            Some(c) => {
                let mut s = c.to_uppercase().to_string();
                s.extend(chars);
                s
            }
            None => correction.to_string(),
        }
    } else {
        correction.to_string()
    }
}

/// Levenshtein edit distance.
fn edit_distance(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n as u32;
    }
    if n == 0 {
        return m as u32;
    }

    let mut prev: Vec<u32> = (0..=n as u32).collect();
    let mut curr = vec![0u32; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = (i + 1) as u32;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = u32::from(a_ch != b_ch);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrects_common_ocr_errors() {
        // l→i substitution
        assert_eq!(correct_test_names("Hemoglobln 13.5"), "Hemoglobin 13.5");
        // u→n substitution
        assert_eq!(correct_test_names("creatiniue 1.1 mg/dl"), "creatinine 1.1 mg/dl");
    }

    #[test]
    fn preserves_known_terms() {
        assert_eq!(correct_test_names("Hemoglobin"), "Hemoglobin");
        assert_eq!(correct_test_names("FERRITIN"), "FERRITIN");
    }

    #[test]
    fn preserves_short_words_and_numbers() {
        assert_eq!(correct_test_names("mch 29 pg"), "mch 29 pg");
        assert_eq!(correct_test_names("10000 cells"), "10000 cells");
    }

    #[test]
    fn preserves_case_pattern() {
        assert_eq!(correct_test_names("HEMOGLOBLN"), "HEMOGLOBIN");
        assert_eq!(correct_test_names("Hemoglobln"), "Hemoglobin");
        assert_eq!(correct_test_names("hemoglobln"), "hemoglobin");
    }

    #[test]
    fn does_not_correct_unrelated_words() {
        assert_eq!(correct_test_names("Patient"), "Patient");
        assert_eq!(correct_test_names("hospital"), "hospital");
        assert_eq!(correct_test_names("morning"), "morning");
    }

    #[test]
    fn ambiguous_matches_are_left_alone() {
        let terms = vec!["abcde".to_string(), "abcdf".to_string()];
        // one substitution away from both terms
        assert_eq!(correct_with_terms("abcdx", &terms), "abcdx");
    }

    #[test]
    fn edit_distance_basic() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("creatinine", "creatiniue"), 1);
    }

    #[test]
    fn correction_terms_sorted_and_long_enough() {
        for window in CORRECTION_TERMS.windows(2) {
            assert!(window[0] < window[1], "{:?} >= {:?}", window[0], window[1]);
        }
        assert!(CORRECTION_TERMS.iter().all(|t| t.chars().count() >= MIN_WORD_LEN));
        assert!(CORRECTION_TERMS.iter().any(|t| t == "hemoglobin"));
    }
}
