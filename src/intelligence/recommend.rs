//! Blood-report recommendation engine.
//!
//! Each extracted result is converted to its reference unit, classified against
//! the gender-specific interval, and abnormal findings are rendered with advice.
//! A result that cannot be scored (no reference, unparseable value, unit that
//! does not convert) is logged and skipped; the rest of the report still runs.

use crate::models::{Classification, EvaluatedFinding, ExtractedResult, ExtractionResults, Gender};
use crate::pipeline::units::{convert, normalize};

use super::helpers::{format_number, title_case};
use super::reference::{ReferenceRange, ReferenceTable};

pub const HEALTHY_MESSAGE: &str =
    "Health Status: Healthy\n\nAll your test results are within normal ranges. Keep up your healthy lifestyle!";

const ABNORMAL_HEADER: &str = "Health Status: Abnormal\n\n";

/// Recommendations against the builtin reference table.
pub fn recommend(results: &ExtractionResults, gender: Gender) -> String {
    recommend_with(ReferenceTable::builtin(), results, gender)
}

pub fn recommend_with(table: &ReferenceTable, results: &ExtractionResults, gender: Gender) -> String {
    render(&evaluate(table, results, gender))
}

/// Score every result that has a reference range, in insertion order.
pub fn evaluate(
    table: &ReferenceTable,
    results: &ExtractionResults,
    gender: Gender,
) -> Vec<EvaluatedFinding> {
    results
        .iter()
        .filter_map(|result| evaluate_one(table, result, gender))
        .collect()
}

fn evaluate_one(
    table: &ReferenceTable,
    result: &ExtractedResult,
    gender: Gender,
) -> Option<EvaluatedFinding> {
    let key = result.test_key.as_str();

    let Some(range) = table.lookup(key, gender) else {
        tracing::warn!(test_key = key, "No reference range, skipping");
        return None;
    };

    let value = match result.value.trim().replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            tracing::error!(test_key = key, "Could not parse value, skipping");
            return None;
        }
    };

    let value_converted = match convert_to_reference(value, &result.unit, range) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(test_key = key, unit = %result.unit, error = %e, "Unit conversion failed, skipping");
            return None;
        }
    };

    let unit = normalize(&range.unit);
    let classification = classify(value_converted, range.low, range.high);
    tracing::debug!(
        test_key = key,
        value = value_converted,
        unit = %unit,
        low = range.low,
        high = range.high,
        classification = %classification,
        "Compared against reference"
    );

    let advice = classification
        .is_abnormal()
        .then(|| table.advice(key, classification))
        .flatten()
        .map(str::to_string);

    Some(EvaluatedFinding {
        test_key: key.to_string(),
        value_converted,
        unit,
        low: range.low,
        high: range.high,
        classification,
        advice,
    })
}

/// An empty measured unit is taken to already be the reference unit.
fn convert_to_reference(
    value: f64,
    unit: &str,
    range: &ReferenceRange,
) -> Result<f64, crate::pipeline::units::ConversionError> {
    if unit.trim().is_empty() {
        return Ok(value);
    }
    convert(value, unit, &range.unit)
}

/// Closed interval: both bounds are normal.
pub fn classify(value: f64, low: f64, high: f64) -> Classification {
    if value < low {
        Classification::Low
    } else if value > high {
        Classification::High
    } else {
        Classification::Normal
    }
}

/// Render findings as report text. Only abnormal findings are listed.
pub fn render(findings: &[EvaluatedFinding]) -> String {
    let paragraphs: Vec<String> = findings
        .iter()
        .filter(|f| f.classification.is_abnormal())
        .map(render_finding)
        .collect();

    if paragraphs.is_empty() {
        HEALTHY_MESSAGE.to_string()
    } else {
        format!("{ABNORMAL_HEADER}{}", paragraphs.join("\n\n"))
    }
}

fn render_finding(finding: &EvaluatedFinding) -> String {
    let direction = match finding.classification {
        Classification::Low => "LOW",
        _ => "HIGH",
    };
    let mut msg = format!(
        "{} is {direction} ({} {unit}, normal: {}-{} {unit}).",
        title_case(&finding.test_key),
        format_number(finding.value_converted),
        format_number(finding.low),
        format_number(finding.high),
        unit = finding.unit,
    );
    if let Some(advice) = &finding.advice {
        msg.push_str(" Recommendation: ");
        msg.push_str(advice);
    }
    msg
}
