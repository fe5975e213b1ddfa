//! PDF processing module.

mod extractor;

pub use extractor::{PdfSheet, TextRun};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract plain text from the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract positioned text runs from a specific page (1-indexed).
    fn extract_runs(&self, page: u32) -> Result<Vec<TextRun>>;
}
