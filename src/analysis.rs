//! Request-level orchestration for blood and urine analyses.
//!
//! A request either yields its full result or an `AnalysisError` with no partial
//! data. Field- and panel-level problems are absorbed further down and only show up
//! in the logs.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intelligence::recommend::recommend_with;
use crate::intelligence::reference::ReferenceTable;
use crate::models::{ExtractionResults, Gender, UrineTestType};
use crate::pipeline::extraction::{extract_with, sanitize_report_text, ExtractionOptions, TextExtractor};
use crate::urine::parser::parse_report_text;
use crate::urine::recommendations::render_report;

// ───────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    NoContent,
    NoResults,
    InternalError,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("No content")]
    NoContent,
    #[error("No results")]
    NoResults,
    #[error("Analyze error: {0}")]
    Internal(String),
}

/// Serializable error body for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl AnalysisError {
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::NoContent => ErrorStatus::NoContent,
            Self::NoResults => ErrorStatus::NoResults,
            Self::Internal(_) => ErrorStatus::InternalError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NoContent => "NO_CONTENT",
            Self::NoResults => "NO_RESULTS",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Internal details stay in the logs, not in the body.
    pub fn body(&self) -> ErrorBody {
        let error = match self {
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "Analysis internal error");
                "Analyze error".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody {
            error,
            code: self.code().to_string(),
        }
    }
}

impl From<crate::pipeline::extraction::LexiconError> for AnalysisError {
    fn from(err: crate::pipeline::extraction::LexiconError) -> Self {
        Self::Internal(err.to_string())
    }
}

// ───────────────────────────────────────────────
// Responses
// ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodAnalysis {
    pub recommendations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrineAnalysis {
    pub report: String,
}

/// Success envelope: `{"status": "ok", "cid": ..., "analyzed_at": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse<T> {
    pub status: &'static str,
    pub cid: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub data: T,
}

impl<T> AnalysisResponse<T> {
    pub fn ok(cid: Uuid, data: T) -> Self {
        Self {
            status: "ok",
            cid,
            analyzed_at: Utc::now(),
            data,
        }
    }
}

/// Run one request inside an `analysis` span tagged with its correlation id.
pub fn respond<T>(
    cid: Uuid,
    kind: &'static str,
    run: impl FnOnce() -> Result<T, AnalysisError>,
) -> Result<AnalysisResponse<T>, AnalysisError> {
    let span = tracing::info_span!("analysis", cid = %cid, kind);
    let _guard = span.enter();

    tracing::info!("Start analysis");
    match run() {
        Ok(data) => {
            tracing::info!("Analysis successful");
            Ok(AnalysisResponse::ok(cid, data))
        }
        Err(e) => {
            tracing::warn!(status = ?e.status(), error = %e, "Analysis failed");
            Err(e)
        }
    }
}

// ───────────────────────────────────────────────
// Blood
// ───────────────────────────────────────────────

/// Options for a blood analysis. `reference: None` uses the builtin table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BloodRequest<'a> {
    pub gender: Gender,
    pub reference: Option<&'a ReferenceTable>,
    pub extraction: ExtractionOptions,
}

/// Extract test values, failing the request when there is no text or no test.
pub fn extract_results(
    text: &str,
    options: &ExtractionOptions,
) -> Result<ExtractionResults, AnalysisError> {
    let text = sanitize_report_text(text);
    if text.trim().is_empty() {
        return Err(AnalysisError::NoContent);
    }

    let results = extract_with(&text, options)?;
    if results.is_empty() {
        return Err(AnalysisError::NoResults);
    }
    tracing::info!(count = results.len(), "Extracted test results");
    Ok(results)
}

pub fn analyze_blood_text(text: &str, gender: Gender) -> Result<BloodAnalysis, AnalysisError> {
    analyze_blood_text_with(
        text,
        &BloodRequest {
            gender,
            ..Default::default()
        },
    )
}

pub fn analyze_blood_text_with(
    text: &str,
    request: &BloodRequest<'_>,
) -> Result<BloodAnalysis, AnalysisError> {
    let results = extract_results(text, &request.extraction)?;
    let table = request.reference.unwrap_or_else(|| ReferenceTable::builtin());
    Ok(BloodAnalysis {
        recommendations: recommend_with(table, &results, request.gender),
    })
}

pub fn analyze_blood_file(
    extractor: &dyn TextExtractor,
    path: &Path,
    request: &BloodRequest<'_>,
) -> Result<BloodAnalysis, AnalysisError> {
    let text = read_report(extractor, path)?;
    analyze_blood_text_with(&text, request)
}

// ───────────────────────────────────────────────
// Urine
// ───────────────────────────────────────────────

pub fn analyze_urine_text(
    text: &str,
    test_type: UrineTestType,
) -> Result<UrineAnalysis, AnalysisError> {
    let text = sanitize_report_text(text);
    if text.trim().is_empty() {
        return Err(AnalysisError::NoContent);
    }

    let mut report = parse_report_text(&text);
    if report.is_empty() {
        return Err(AnalysisError::NoResults);
    }
    report.test_type = test_type;

    Ok(UrineAnalysis {
        report: render_report(&report),
    })
}

pub fn analyze_urine_file(
    extractor: &dyn TextExtractor,
    path: &Path,
    test_type: UrineTestType,
) -> Result<UrineAnalysis, AnalysisError> {
    let text = read_report(extractor, path)?;
    analyze_urine_text(&text, test_type)
}

/// Collaborator failures are logged and read as "no content".
pub fn read_report(extractor: &dyn TextExtractor, path: &Path) -> Result<String, AnalysisError> {
    extractor.extract_text(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Text extraction failed");
        AnalysisError::NoContent
    })
}
