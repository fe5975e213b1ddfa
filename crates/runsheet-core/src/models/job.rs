//! Job record models for run-sheet extraction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Identity of a document at the input boundary.
///
/// The document bytes themselves are supplied by an external store; this
/// handle carries everything the pipeline needs to key and attribute the
/// parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Reference to the originating file (path, mail id, etc.).
    pub file_ref: String,

    /// Driver/customer context the sheet was issued under.
    pub source: SourceContext,

    /// Calendar date the sheet covers.
    pub date: NaiveDate,
}

impl DocumentHandle {
    /// Key under which this document's records are persisted.
    pub fn key(&self) -> DocumentKey {
        DocumentKey {
            date: self.date,
            source: self.source.label(),
        }
    }
}

/// Driver/customer context of an ingested sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    /// Driver/engineer the sheet was assigned to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Issuing customer, when known ahead of parsing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

impl SourceContext {
    /// Stable label used in the persistence key.
    pub fn label(&self) -> String {
        self.driver
            .as_deref()
            .or(self.customer.as_deref())
            .unwrap_or("UNKNOWN")
            .to_uppercase()
    }

    /// Case-insensitive check against driver and customer context.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_uppercase();
        self.driver
            .as_deref()
            .map(|d| d.to_uppercase().contains(&needle))
            .unwrap_or(false)
            || self
                .customer
                .as_deref()
                .map(|c| c.to_uppercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Key identifying one document's record set in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Sheet date.
    pub date: NaiveDate,

    /// Source label (driver or customer).
    pub source: String,
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.date, self.source)
    }
}

/// Structural kind of an extracted content unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// A line of free text.
    Line,
    /// A cell from a detected table row.
    Cell,
}

/// One unit of extracted content, tagged with its structural position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Text content of the unit.
    pub text: String,

    /// Page number (1-indexed).
    pub page: u32,

    /// Row index within the page (line number or table row).
    pub row: u32,

    /// Column index for table cells; `None` for text lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    /// Line or cell.
    pub kind: UnitKind,
}

impl ContentUnit {
    /// A plain text-line unit.
    pub fn line(text: impl Into<String>, page: u32, row: u32) -> Self {
        Self {
            text: text.into(),
            page,
            row,
            column: None,
            kind: UnitKind::Line,
        }
    }

    /// A table-cell unit.
    pub fn cell(text: impl Into<String>, page: u32, row: u32, column: u32) -> Self {
        Self {
            text: text.into(),
            page,
            row,
            column: Some(column),
            kind: UnitKind::Cell,
        }
    }
}

/// A normalized candidate job record.
///
/// Transient: produced fresh on every parse pass and only given durable
/// identity by the merge step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job number from the sheet header.
    pub job_number: String,

    /// Sheet date this job belongs to.
    pub date: NaiveDate,

    /// Cleaned customer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    /// Combined, cleaned address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Canonical UK postcode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,

    /// Canonical activity label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,

    /// Extraction diagnostics.
    #[serde(default)]
    pub diagnostics: JobDiagnostics,
}

impl JobRecord {
    /// Create an empty candidate for a job number and date.
    pub fn new(job_number: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            job_number: job_number.into(),
            date,
            customer: None,
            address: None,
            postcode: None,
            activity: None,
            diagnostics: JobDiagnostics::default(),
        }
    }

    /// Whether the record satisfies the acceptance invariant:
    /// a job number plus at least one of customer/activity.
    pub fn is_acceptable(&self) -> bool {
        !self.job_number.is_empty() && (self.customer.is_some() || self.activity.is_some())
    }
}

/// Per-job extraction diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDiagnostics {
    /// Extraction strategy that produced this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Normalizer profile that produced the fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Field-completeness confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Warnings accumulated while normalizing this job.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Business status of a persisted job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Scheduled, not yet worked.
    #[default]
    Pending,
    /// Work completed.
    Completed,
    /// Did Not Carry Out - scheduled work was not performed.
    Dnco,
    /// Cancelled before the visit.
    Cancelled,
}

impl JobStatus {
    /// Parse a status from its stored form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(JobStatus::Pending),
            "completed" | "complete" | "done" => Some(JobStatus::Completed),
            "dnco" => Some(JobStatus::Dnco),
            "cancelled" | "canceled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Stored/display form.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Dnco => "dnco",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// Fields owned by the downstream business workflow.
///
/// The pipeline never writes these except as an explicit pass-through
/// during merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectedFields {
    /// Workflow status.
    pub status: JobStatus,

    /// Agreed pay amount for the job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_amount: Option<Decimal>,

    /// Link to the pay/remittance run the job was billed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_linkage: Option<String>,

    /// Free-text notes entered by a human.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_notes: Option<String>,
}

/// A job record as held by the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedJobRecord {
    /// The extracted record.
    pub record: JobRecord,

    /// Protected business fields; `None` when they could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<ProtectedFields>,

    /// Flagged for manual review (e.g. unreadable protected fields).
    #[serde(default)]
    pub needs_review: bool,
}

impl PersistedJobRecord {
    /// Wrap a freshly inserted candidate with default protected fields.
    pub fn inserted(record: JobRecord) -> Self {
        Self {
            record,
            protected: Some(ProtectedFields::default()),
            needs_review: false,
        }
    }
}

/// Output of one parse pass over a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    /// Accepted, normalized job records.
    pub accepted: Vec<JobRecord>,

    /// Candidates dropped for failing validation.
    pub rejected_count: usize,

    /// Known non-job administrative entries filtered out.
    pub filtered_count: usize,

    /// Weighted completeness score over the accepted records.
    pub completeness_score: f32,

    /// Strategy that produced the content units.
    pub strategy: String,

    /// State the document reached.
    pub state: DocumentState,

    /// Document-level warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ParseResult {
    /// A rejected-document result carrying a diagnostic.
    pub fn rejected(strategy: &str, reason: impl Into<String>) -> Self {
        Self {
            accepted: Vec::new(),
            rejected_count: 0,
            filtered_count: 0,
            completeness_score: 0.0,
            strategy: strategy.to_string(),
            state: DocumentState::Rejected,
            warnings: vec![reason.into()],
        }
    }
}

/// Per-document pipeline state.
///
/// Linear progression with two terminal states; the merge step decides
/// between `Merged` and `Inserted` depending on whether existing records
/// were found for the document key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Unparsed,
    Extracted,
    Segmented,
    Normalized,
    Validated,
    Merged,
    Inserted,
    Scored,
    Persisted,
    Rejected,
}

impl DocumentState {
    /// Name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            DocumentState::Unparsed => "unparsed",
            DocumentState::Extracted => "extracted",
            DocumentState::Segmented => "segmented",
            DocumentState::Normalized => "normalized",
            DocumentState::Validated => "validated",
            DocumentState::Merged => "merged",
            DocumentState::Inserted => "inserted",
            DocumentState::Scored => "scored",
            DocumentState::Persisted => "persisted",
            DocumentState::Rejected => "rejected",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: DocumentState) -> bool {
        use DocumentState::*;
        if next == Rejected {
            // Any non-terminal state may reject.
            return !matches!(self, Persisted | Rejected);
        }
        matches!(
            (self, next),
            (Unparsed, Extracted)
                | (Extracted, Segmented)
                | (Segmented, Normalized)
                | (Normalized, Validated)
                | (Validated, Scored)
                | (Scored, Merged)
                | (Scored, Inserted)
                | (Merged, Persisted)
                | (Inserted, Persisted)
        )
    }

    /// Advance to `next`, or report the illegal transition.
    pub fn advance(self, next: DocumentState) -> std::result::Result<DocumentState, MergeError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(MergeError::InvalidTransition {
                from: self.name(),
                to: next.name(),
            })
        }
    }
}
