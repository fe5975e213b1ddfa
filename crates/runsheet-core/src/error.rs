//! Error types for the runsheet-core library.

use thiserror::Error;

/// Main error type for the runsheet library.
#[derive(Error, Debug)]
pub enum RunsheetError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Content extraction error.
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Field normalization error.
    #[error("normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Merge/reconciliation error.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// Persistence boundary error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to content-unit extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No content units could be produced by any strategy.
    #[error("no content units extracted")]
    NoContent,

    /// Requested strategy is not usable for this document.
    #[error("strategy unavailable: {0}")]
    StrategyUnavailable(String),
}

/// Errors raised by field normalizers and source-specific overrides.
///
/// An override returning one of these degrades the single affected job to
/// the generic normalizers; it never aborts the document.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// A field the override depends on is absent from the segment.
    #[error("missing field for {profile}: {field}")]
    MissingField { profile: &'static str, field: &'static str },

    /// A field value did not match the shape the override expects.
    #[error("malformed {field} in {profile}: {value}")]
    Malformed {
        profile: &'static str,
        field: &'static str,
        value: String,
    },
}

/// Errors raised by the merge/reconciliation engine.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Attempted an illegal document state transition.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// Merge was requested for a document that did not reach a mergeable state.
    #[error("document not mergeable in state {0}")]
    NotMergeable(&'static str),
}

/// Errors at the persistence boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded.
    #[error("corrupt record for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The write could not be applied atomically.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Result type for the runsheet library.
pub type Result<T> = std::result::Result<T, RunsheetError>;
