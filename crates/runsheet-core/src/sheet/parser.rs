//! Run-sheet parser tying the pipeline stages together.

use tracing::{debug, info, warn};

use super::registry::ParserRegistry;
use super::segment::Segmenter;
use super::validate::Validator;
use crate::extract::{ExtractionStrategy, Extractor, StrategyChoice};
use crate::models::config::RunsheetConfig;
use crate::models::job::{ContentUnit, DocumentHandle, DocumentState, ParseResult};
use crate::score::QualityScorer;

/// Parser for one run-sheet document.
///
/// Parsing is pure: the same document and the same rules always produce the
/// same candidate set, so documents can be re-parsed at will while rules
/// evolve. Extraction failure never escapes this boundary; the document
/// comes back `Rejected` with a diagnostic instead.
pub struct RunSheetParser {
    config: RunsheetConfig,
    registry: ParserRegistry,
    validator: Validator,
    scorer: QualityScorer,
}

impl RunSheetParser {
    /// Create a parser from configuration.
    pub fn new(config: RunsheetConfig) -> Self {
        let registry = if config.extraction.use_source_profiles {
            ParserRegistry::with_default_profiles()
        } else {
            ParserRegistry::empty()
        };
        let scorer = QualityScorer::new(&config.scoring);

        Self {
            config,
            registry,
            validator: Validator::new(),
            scorer,
        }
    }

    /// Replace the source-profile registry.
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Parse a document from PDF bytes.
    pub fn parse_bytes(
        &self,
        handle: &DocumentHandle,
        data: &[u8],
        choice: StrategyChoice,
    ) -> ParseResult {
        let extractor = Extractor::new(self.config.clone());

        match extractor.extract(data, choice) {
            Ok(extraction) => self.parse_units(handle, &extraction.units, extraction.strategy),
            Err(e) => {
                warn!("Document {} rejected: {}", handle.file_ref, e);
                ParseResult::rejected("none", format!("extraction failed: {}", e))
            }
        }
    }

    /// Parse a document from already-extracted content units.
    pub fn parse_units(
        &self,
        handle: &DocumentHandle,
        units: &[ContentUnit],
        strategy: ExtractionStrategy,
    ) -> ParseResult {
        let mut state = DocumentState::Unparsed;
        let mut advance = |next: DocumentState| {
            debug!("Document state {} -> {}", state.name(), next.name());
            state = next;
        };
        let mut warnings = Vec::new();

        if units.is_empty() {
            return ParseResult::rejected(strategy.as_str(), "no content units");
        }
        advance(DocumentState::Extracted);
        debug!(
            "Document {}: {} units via {} mode",
            handle.file_ref,
            units.len(),
            strategy
        );

        let segments = Segmenter::new().segment(units);
        advance(DocumentState::Segmented);
        if segments.is_empty() {
            warnings.push("no job-start markers found".to_string());
        }

        let mut candidates = Vec::with_capacity(segments.len());
        for segment in &segments {
            let mut record = self
                .registry
                .normalize_job(&handle.source, segment, handle.date);
            record.diagnostics.strategy = Some(strategy.as_str().to_string());
            record.diagnostics.confidence = confidence(&record);
            candidates.push(record);
        }
        advance(DocumentState::Normalized);

        let outcome = self.validator.validate_all(candidates);
        advance(DocumentState::Validated);

        let completeness_score = self.scorer.score(&outcome.accepted);
        advance(DocumentState::Scored);

        info!(
            "Document {}: {} accepted, {} rejected, {} filtered, score {:.2}",
            handle.file_ref,
            outcome.accepted.len(),
            outcome.rejected_count,
            outcome.filtered_count,
            completeness_score
        );

        ParseResult {
            accepted: outcome.accepted,
            rejected_count: outcome.rejected_count,
            filtered_count: outcome.filtered_count,
            completeness_score,
            strategy: strategy.as_str().to_string(),
            state,
            warnings,
        }
    }

    /// Parse with both strategies for an A/B comparison.
    pub fn parse_both(
        &self,
        handle: &DocumentHandle,
        data: &[u8],
    ) -> (ParseResult, ParseResult) {
        let table = self.parse_bytes(handle, data, StrategyChoice::Table);
        let line = self.parse_bytes(handle, data, StrategyChoice::Line);
        (table, line)
    }

    /// The scorer configured for this parser.
    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }
}

impl Default for RunSheetParser {
    fn default() -> Self {
        Self::new(RunsheetConfig::default())
    }
}

/// Per-record confidence: full marks minus a deduction per missing field.
fn confidence(record: &crate::models::job::JobRecord) -> f32 {
    let mut confidence = 1.0f32;
    if record.customer.is_none() {
        confidence -= 0.2;
    }
    if record.activity.is_none() {
        confidence -= 0.2;
    }
    if record.postcode.is_none() {
        confidence -= 0.15;
    }
    if record.address.is_none() {
        confidence -= 0.15;
    }
    confidence.max(0.0)
}
