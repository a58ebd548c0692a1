//! Repair of dropped decimal points in OCR'd values.
//!
//! "1350" printed for a hemoglobin of 13.50 g/dL is a common scan artifact. When a
//! test has an expected magnitude window, the raw value divided by 10, then by 100,
//! is tried against it and the first quotient inside the window is used.
//! The heuristic can mis-correct a genuinely extreme value; it is kept as-is.

use super::lexicon::Lexicon;

const CORRECTION_FACTORS: [f64; 2] = [10.0, 100.0];

/// Correct a raw numeric token for `test_key` using the builtin lexicon's windows.
///
/// Returns the value formatted with two decimals, or the input unchanged when it does
/// not parse as a number.
pub fn correct_value(test_key: &str, raw: &str) -> String {
    let expected = Lexicon::builtin()
        .ok()
        .and_then(|lexicon| lexicon.expected_range(test_key));
    correct_with_range(expected, raw)
}

/// Same as [`correct_value`] with an explicit expected window.
pub fn correct_with_range(expected: Option<(f64, f64)>, raw: &str) -> String {
    let Ok(value) = raw.trim().replace(',', ".").parse::<f64>() else {
        tracing::debug!(raw, "Numeric token did not parse, left uncorrected");
        return raw.to_string();
    };

    if let Some((min, max)) = expected {
        for factor in CORRECTION_FACTORS {
            let corrected = value / factor;
            if (min..=max).contains(&corrected) {
                tracing::debug!(raw, factor, "Applied decimal correction");
                return format!("{corrected:.2}");
            }
        }
    }

    format!("{value:.2}")
}
