//! Common regex patterns for run-sheet extraction.
//!
//! Compiled once at first use and only ever read after that; normalizer
//! calls share the table and never mutate it.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Job number grammar: seven-digit token.
    pub static ref JOB_NUMBER: Regex = Regex::new(
        r"\b(\d{7})\b"
    ).unwrap();

    // Job-start marker: job number at a line/row boundary.
    pub static ref JOB_START: Regex = Regex::new(
        r"^\s*(\d{7})\b"
    ).unwrap();

    // UK postcode grammar: outward code + inward code, spacing optional.
    pub static ref POSTCODE: Regex = Regex::new(
        r"(?i)\b([A-Z]{1,2}[0-9][0-9A-Z]?)\s*([0-9][A-Z]{2})\b"
    ).unwrap();

    // Store/reference codes embedded in headers and address blocks,
    // e.g. "16661UK".
    pub static ref STORE_REF: Regex = Regex::new(
        r"\b(\d{4,6})UK\b"
    ).unwrap();

    // Section-end markers that close the current job.
    pub static ref SECTION_END: Regex = Regex::new(
        r"(?i)customer\s+(?:signature|print|sig\.?)"
    ).unwrap();

    // Banner artifacts that must never survive into a customer name.
    pub static ref DO_NOT_INVOICE: Regex = Regex::new(
        r"(?i)do\s+not\s+invoice"
    ).unwrap();

    // Instruction/notes markers: once seen, address buffering stops.
    pub static ref INSTRUCTION: Regex = Regex::new(
        r"(?i)^\s*(?:please\b|note[:\s]|notes[:\s]|call\b|ring\b|instructions?\b|deliver\b|collect\s+from\b|leave\s+with\b)"
    ).unwrap();

    // Contact-name-only lines.
    pub static ref CONTACT_LINE: Regex = Regex::new(
        r"(?i)^\s*(?:contact[:\s]|att(?:n|ention)[:\s]|(?:mr|mrs|ms|miss|dr)\.?\s+[A-Z][a-z]+)"
    ).unwrap();

    // Leading numeric index tokens, e.g. "3." or "12)".
    pub static ref INDEX_TOKEN: Regex = Regex::new(
        r"^\s*\d{1,3}[.)]\s+"
    ).unwrap();

    // Trailing non-word noise left behind by cell boundaries.
    pub static ref TRAILING_NONWORD: Regex = Regex::new(
        r"[\s\-,;:./]+$"
    ).unwrap();

    // Leading separator noise.
    pub static ref LEADING_NONWORD: Regex = Regex::new(
        r"^[\s\-,;:./]+"
    ).unwrap();
}

/// Canonical activity vocabulary; a recognized activity is always one of
/// these exact labels.
pub const CANONICAL_ACTIVITIES: &[&str] = &[
    "TECH EXCHANGE",
    "REPAIR WITH PARTS",
    "MAINTENANCE",
    "SURVEY",
    "INSPECTION",
    "UPGRADE",
    "CONFIGURATION",
    "TRAINING",
    "CONSULTATION",
];

/// Partial-term fallback map, applied only when no exact label matches.
/// Terms are checked in order; no match means no activity, never a guess.
pub const PARTIAL_ACTIVITY_MAP: &[(&str, &str)] = &[
    ("TECH", "TECH EXCHANGE"),
    ("EXCH", "TECH EXCHANGE"),
    ("REPAIR", "REPAIR WITH PARTS"),
    ("MAINT", "MAINTENANCE"),
    ("CONFIG", "CONFIGURATION"),
    ("INSPECT", "INSPECTION"),
    ("CONSULT", "CONSULTATION"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_start_at_boundary_only() {
        assert!(JOB_START.is_match("4269797 TESCO STORE"));
        assert!(JOB_START.is_match("  4316807"));
        assert!(!JOB_START.is_match("ref 4269797"));
        assert!(!JOB_START.is_match("42697"));
    }

    #[test]
    fn test_postcode_grammar_variants() {
        for input in ["M1 1AA", "M11AA", "SW1A 0AA", "b33 8th", "CR2 6XH"] {
            assert!(POSTCODE.is_match(input), "should match {input}");
        }
        assert!(!POSTCODE.is_match("12345"));
    }

    #[test]
    fn test_store_ref() {
        assert!(STORE_REF.is_match("16661UK"));
        assert!(!STORE_REF.is_match("166UK"));
        assert!(!STORE_REF.is_match("16661UKX"));
    }

    #[test]
    fn test_instruction_marker() {
        assert!(INSTRUCTION.is_match("PLEASE CALL AHEAD"));
        assert!(INSTRUCTION.is_match("Note: keys at reception"));
        assert!(INSTRUCTION.is_match("deliver to rear entrance"));
        assert!(!INSTRUCTION.is_match("UNIT 4 TRAFFORD PARK"));
    }

    #[test]
    fn test_contact_line() {
        assert!(CONTACT_LINE.is_match("Contact: J Smith"));
        assert!(CONTACT_LINE.is_match("Mr Patel"));
        assert!(!CONTACT_LINE.is_match("MANCHESTER"));
    }
}
