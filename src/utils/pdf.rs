// PDF utilities used by upload validation and read_data_tool.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to read PDF file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(String),

    #[error("PDF parser panicked: {0}")]
    Panicked(String),
}

/// One page of extracted text, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_content: String,
}

impl Page {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
        }
    }
}

/// Loads a document from a local path as a sequence of pages.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<Page>, PdfError>;

    /// Confirms the document can be opened, returning its page count.
    /// Implementations should avoid full text extraction here.
    fn check(&self, path: &Path) -> Result<usize, PdfError> {
        self.load(path).map(|pages| pages.len())
    }
}

/// Default loader, a thin wrapper over the `pdf-extract` crate API.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractLoader;

impl DocumentLoader for PdfExtractLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>, PdfError> {
        // pdf-extract panics on some malformed inputs instead of returning an error.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(path)
        }));

        match outcome {
            Ok(Ok(pages)) => Ok(pages.into_iter().map(Page::new).collect()),
            Ok(Err(e)) => Err(PdfError::Parse(e.to_string())),
            Err(payload) => Err(PdfError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    /// Parses the document structure with lopdf without decoding any content streams.
    fn check(&self, path: &Path) -> Result<usize, PdfError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| lopdf::Document::load(path)));

        let document = match outcome {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => return Err(PdfError::Parse(e.to_string())),
            Err(payload) => return Err(PdfError::Panicked(panic_message(payload.as_ref()))),
        };

        match document.get_pages().len() {
            0 => Err(PdfError::Parse("document has no pages".to_string())),
            count => Ok(count),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Returns true if the head bytes carry the `%PDF-` magic.
/// Content-Type is not consulted.
pub fn has_pdf_signature(head: &[u8]) -> bool {
    head.starts_with(b"%PDF-")
}


#[cfg(test)]
mod tests {
    use super::fixtures::text_pdf;
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn extracts_text_page_by_page() {
        let file = write_temp(&text_pdf(&["Revenue", "Liabilities"]));

        let pages = PdfExtractLoader.load(file.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].page_content.contains("Revenue"));
        assert!(pages[1].page_content.contains("Liabilities"));
        assert!(!pages[0].page_content.contains("Liabilities"));
    }

    #[test]
    fn check_counts_pages_without_extracting() {
        let file = write_temp(&text_pdf(&["One", "Two", "Three"]));
        assert_eq!(PdfExtractLoader.check(file.path()).unwrap(), 3);

        let garbage = write_temp(b"%PDF-1.4\nthis is not really a pdf");
        assert!(PdfExtractLoader.check(garbage.path()).is_err());
    }

    #[test]
    fn detects_pdf_signature() {
        assert!(has_pdf_signature(b"%PDF-1.4"));
        assert!(!has_pdf_signature(b"%PD"));
        assert!(!has_pdf_signature(b""));
    }

    #[test]
    fn garbage_file_is_an_error_not_a_panic() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4\nthis is not really a pdf").unwrap();

        let result = PdfExtractLoader.load(file.path());
        assert!(result.is_err());
    }
}
