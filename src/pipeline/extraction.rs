//! Text extraction from inbox documents.
//!
//! The engine itself is a collaborator behind `TextExtractor`; the bundled
//! implementation reads plaintext formats directly and pulls text from PDFs
//! page by page. Pages without a text layer are marked inline rather than
//! omitted, so page count survives into the extracted output.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Text extraction abstraction (allows mocking for tests).
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Sentinel prefix returned for formats the extractor cannot read.
const UNSUPPORTED_MARKER: &str = "[ERROR] Unsupported file format for text extraction:";

/// Reads documents from disk: plaintext formats verbatim, PDFs per page.
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::FileNotFound(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        tracing::info!(file = %path.display(), "Extracting text");

        match ext.as_str() {
            "pdf" => extract_pdf(path),
            "txt" | "md" | "json" => Ok(std::fs::read_to_string(path)?),
            other => Ok(format!("{UNSUPPORTED_MARKER} .{other}")),
        }
    }
}

/// Extract PDF text with one marker line per page.
///
/// pdf-extract can panic on malformed files, so the call is fenced with
/// `catch_unwind` and surfaced as a normal extraction error.
fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
    let pages = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_by_pages(path)
    }))
    .map_err(|_| ExtractionError::Pdf("extractor panicked on malformed PDF".to_string()))?
    .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let mut sections = Vec::with_capacity(pages.len());
    for (idx, text) in pages.iter().enumerate() {
        let page_number = idx + 1;
        if text.trim().is_empty() {
            tracing::warn!(page = page_number, "Page contains no extractable text");
            sections.push(format!("--- PAGE {page_number} [NO TEXT LAYER] ---"));
        } else {
            sections.push(format!("--- PAGE {page_number} ---\n{text}"));
        }
    }

    Ok(sections.join("\n"))
}

/// Mock extractor returning canned text or a canned failure.
pub struct MockTextExtractor {
    outcome: Result<String, String>,
}

impl MockTextExtractor {
    pub fn with_text(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
        }
    }
}

impl TextExtractor for MockTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        match &self.outcome {
            Ok(text) => Ok(text.clone()),
            Err(_) => Err(ExtractionError::FileNotFound(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let result = FileTextExtractor.extract(Path::new("/nowhere/ghost.pdf"));
        assert!(matches!(result, Err(ExtractionError::FileNotFound(_))));
    }

    #[test]
    fn reads_plaintext_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.txt");
        std::fs::write(&path, "INVOICE #42\nTotal: 12.00").unwrap();

        let text = FileTextExtractor.extract(&path).unwrap();
        assert!(text.contains("INVOICE #42"));
    }

    #[test]
    fn unsupported_extension_returns_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.tiff");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let text = FileTextExtractor.extract(&path).unwrap();
        assert!(text.starts_with(UNSUPPORTED_MARKER));
        assert!(text.ends_with(".tiff"));
    }

    #[test]
    fn corrupt_pdf_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, "%PDF-1.4 this is not really a pdf").unwrap();

        let result = FileTextExtractor.extract(&path);
        assert!(result.is_err());
    }

    #[test]
    fn mock_extractor_round_trip() {
        let ok = MockTextExtractor::with_text("hello");
        assert_eq!(ok.extract(Path::new("x")).unwrap(), "hello");

        let bad = MockTextExtractor::failing("boom");
        assert!(bad.extract(Path::new("x")).is_err());
    }
}
