//! Candidate validation and non-job filtering.

use tracing::{debug, trace};

use super::rules::canonical_postcode;
use crate::models::job::JobRecord;

/// Fixed customer/activity combinations that are administrative entries,
/// not billable jobs. Matched against the cleaned customer name.
const NON_JOB_ENTRIES: &[(&str, Option<&str>)] = &[
    // Depot visits carry the operator name and no activity.
    ("RICO", None),
    ("DEPOT", None),
];

/// Designated task codes that never represent billable work.
const NON_JOB_CODES: &[&str] = &[
    // Zero-value audit task.
    "9999999",
];

/// Outcome of validating one candidate.
#[derive(Debug)]
pub enum Verdict {
    /// Candidate accepted, fields canonicalized.
    Accepted(Box<JobRecord>),
    /// Candidate failed the acceptance invariant.
    Rejected,
    /// Known administrative entry, silently filtered.
    Filtered,
}

/// Validated output of a candidate batch.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Accepted, canonicalized records.
    pub accepted: Vec<JobRecord>,
    /// Candidates failing validation.
    pub rejected_count: usize,
    /// Administrative entries filtered out.
    pub filtered_count: usize,
}

/// Candidate validator.
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a single candidate.
    pub fn validate(&self, record: JobRecord) -> Verdict {
        if self.is_non_job(&record) {
            trace!("Filtered non-job entry {}", record.job_number);
            return Verdict::Filtered;
        }

        if !record.is_acceptable() {
            trace!("Rejected candidate {:?}", record.job_number);
            return Verdict::Rejected;
        }

        Verdict::Accepted(Box::new(canonicalize(record)))
    }

    /// Validate a batch, keeping the original order of accepted records.
    pub fn validate_all(&self, records: Vec<JobRecord>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        for record in records {
            match self.validate(record) {
                Verdict::Accepted(record) => outcome.accepted.push(*record),
                Verdict::Rejected => outcome.rejected_count += 1,
                Verdict::Filtered => outcome.filtered_count += 1,
            }
        }

        debug!(
            "Validation: {} accepted, {} rejected, {} filtered",
            outcome.accepted.len(),
            outcome.rejected_count,
            outcome.filtered_count
        );
        outcome
    }

    fn is_non_job(&self, record: &JobRecord) -> bool {
        if NON_JOB_CODES.contains(&record.job_number.as_str()) {
            return true;
        }

        let Some(customer) = record.customer.as_deref() else {
            return false;
        };
        let customer = customer.to_uppercase();

        NON_JOB_ENTRIES.iter().any(|(name, activity)| {
            customer.contains(name) && record.activity.as_deref() == *activity
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical field formats for hand-off: upper-case names, canonical
/// postcode spacing.
fn canonicalize(mut record: JobRecord) -> JobRecord {
    record.customer = record.customer.map(|c| c.to_uppercase());
    record.activity = record.activity.map(|a| a.to_uppercase());
    record.postcode = record.postcode.map(|p| canonical_postcode(&p));
    record
}
