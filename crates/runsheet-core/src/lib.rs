//! Core library for run-sheet processing.
//!
//! This crate provides:
//! - PDF content extraction (table-cell and line-based strategies)
//! - Segmentation of content units into per-job buffers
//! - Field normalization (customer, activity, postcode, address) with
//!   source-specific parser overrides
//! - Candidate validation and non-job filtering
//! - Safe merge of re-parsed candidates into persisted records
//! - Completeness scoring for comparing extraction strategies

pub mod error;
pub mod extract;
pub mod merge;
pub mod models;
pub mod pdf;
pub mod score;
pub mod sheet;

pub use error::{
    ExtractError, MergeError, NormalizeError, PdfError, Result, RunsheetError, StoreError,
};
pub use extract::{Extraction, ExtractionStrategy, Extractor, StrategyChoice};
pub use merge::{JobStore, MergeEngine, MergeMode, MergeOutcome};
pub use models::config::RunsheetConfig;
pub use models::job::{
    ContentUnit, DocumentHandle, DocumentKey, DocumentState, JobDiagnostics, JobRecord, JobStatus,
    ParseResult, PersistedJobRecord, ProtectedFields, SourceContext, UnitKind,
};
pub use pdf::{PdfProcessor, PdfSheet};
pub use score::{QualityScorer, StrategyComparison};
pub use sheet::{JobSegment, ParserRegistry, RunSheetParser, Segmenter, SourceProfile, Validator};
