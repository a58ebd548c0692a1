//! Plain-text extraction, no OCR or PDF collaborator required.
//!
//! Reads text files as UTF-8 (lossy). Scanned images, PDFs and DICOM files are
//! reported as `UnsupportedFormat`: they need an external collaborator.

use std::path::Path;

use super::sanitize::sanitize_report_text;
use super::types::{file_extension, is_allowed_file, TextExtractor};
use super::ExtractionError;

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "csv", "md"];

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let ext = file_extension(path).unwrap_or_default();

        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            let reason = if is_allowed_file(path) {
                format!(".{ext} reports need an OCR/PDF/DICOM collaborator")
            } else {
                format!("file type '{ext}' is not accepted")
            };
            return Err(ExtractionError::UnsupportedFormat(reason));
        }

        let bytes = std::fs::read(path)?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Report is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        tracing::debug!(path = %path.display(), chars = text.len(), "Plain text extracted");
        Ok(sanitize_report_text(&text))
    }
}
