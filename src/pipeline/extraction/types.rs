use std::path::Path;

use super::ExtractionError;

/// Report formats accepted at the upload boundary.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "dcm", "txt", "text", "csv", "md"];

/// Collaborator seam: turns a report file into plain text.
///
/// OCR, PDF text-layer and DICOM readers live outside this crate and plug in here.
pub trait TextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Lowercase extension of `path`, if any.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// True when the file extension is one of [`ALLOWED_EXTENSIONS`].
pub fn is_allowed_file(path: &Path) -> bool {
    file_extension(path).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_extensions_are_case_insensitive() {
        assert!(is_allowed_file(Path::new("report.PDF")));
        assert!(is_allowed_file(Path::new("scan.jpeg")));
        assert!(is_allowed_file(Path::new("notes.txt")));
        assert!(!is_allowed_file(Path::new("archive.zip")));
        assert!(!is_allowed_file(Path::new("no_extension")));
    }
}
