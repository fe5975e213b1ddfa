//! Source-specific parser registry.
//!
//! An ordered list of source profiles evaluated first-match-wins; unmatched
//! sources fall through to the generic normalizers. An override failing on
//! one job degrades that job alone to the generic profile.

use chrono::NaiveDate;
use tracing::{trace, warn};

use super::rules::patterns::STORE_REF;
use super::rules::{split_header, ActivityRecognizer, AddressCombiner, FieldRule, PostcodeExtractor};
use super::segment::JobSegment;
use crate::error::NormalizeError;
use crate::models::job::{JobRecord, SourceContext};

/// Result type for normalizer overrides.
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// A per-source normalizer strategy.
pub trait SourceProfile: Send + Sync {
    /// Profile name recorded in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this profile applies to the given source.
    fn matches(&self, source: &SourceContext) -> bool;

    /// Normalize one segment into a candidate record.
    fn normalize(&self, segment: &JobSegment, date: NaiveDate) -> Result<JobRecord>;
}

/// Generic normalizer set; the fallback for every source.
pub struct GenericProfile;

impl GenericProfile {
    pub fn new() -> Self {
        Self
    }

    fn build(&self, segment: &JobSegment, date: NaiveDate) -> JobRecord {
        let mut record = JobRecord::new(&segment.job_number, date);

        let (customer, mut tail) = split_header(&segment.header);
        record.customer = customer;

        record.activity = ActivityRecognizer::new()
            .recognize_from_lines(segment.text_lines())
            .map(|m| m.value);

        record.postcode = PostcodeExtractor::new()
            .extract_from_lines(segment.text_lines())
            .map(|m| m.value);

        // The activity token does not belong in the address tail.
        if let Some(m) = ActivityRecognizer::new().apply(&tail) {
            if let Some((start, end)) = m.position {
                if tail.is_char_boundary(start) && tail.is_char_boundary(end) {
                    tail.replace_range(start..end, "");
                }
            }
        }

        let fragments =
            std::iter::once(tail.as_str()).chain(segment.body.iter().map(String::as_str));
        record.address = AddressCombiner::new().combine(fragments);

        record
    }
}

impl Default for GenericProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProfile for GenericProfile {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn matches(&self, _source: &SourceContext) -> bool {
        true
    }

    fn normalize(&self, segment: &JobSegment, date: NaiveDate) -> Result<JobRecord> {
        Ok(self.build(segment, date))
    }
}

/// Supermarket run sheets: headers carry a "NNNNNUK" store reference that
/// identifies the branch; the billing name is the store identity, not
/// whatever free text surrounds it.
pub struct TescoProfile;

impl SourceProfile for TescoProfile {
    fn name(&self) -> &'static str {
        "tesco"
    }

    fn matches(&self, source: &SourceContext) -> bool {
        source.mentions("TESCO")
    }

    fn normalize(&self, segment: &JobSegment, date: NaiveDate) -> Result<JobRecord> {
        let haystack: Vec<&str> = segment.text_lines().collect();
        let store = haystack
            .iter()
            .find_map(|line| STORE_REF.captures(line))
            .ok_or(NormalizeError::MissingField {
                profile: "tesco",
                field: "store_ref",
            })?;

        let mut record = GenericProfile::new().build(segment, date);
        record.customer = Some(format!("TESCO STORE {}", &store[1]));
        Ok(record)
    }
}

/// Depot logistics sheets: a single body line carries the whole address
/// with " / " separators, and the customer falls back to the depot
/// operator when the header has no name of its own.
pub struct RicoProfile;

impl SourceProfile for RicoProfile {
    fn name(&self) -> &'static str {
        "rico"
    }

    fn matches(&self, source: &SourceContext) -> bool {
        source.mentions("RICO")
    }

    fn normalize(&self, segment: &JobSegment, date: NaiveDate) -> Result<JobRecord> {
        // Re-shape the slash-delimited body before the generic rules run.
        let mut reshaped = segment.clone();
        reshaped.body = segment
            .body
            .iter()
            .flat_map(|line| line.split(" / "))
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();

        let mut record = GenericProfile::new().build(&reshaped, date);
        if record.customer.is_none() {
            record.customer = Some("RICO".to_string());
        }
        Ok(record)
    }
}

/// Ordered, immutable-after-init profile registry.
pub struct ParserRegistry {
    profiles: Vec<Box<dyn SourceProfile>>,
    generic: GenericProfile,
}

impl ParserRegistry {
    /// Registry with no overrides; everything is generic.
    pub fn empty() -> Self {
        Self {
            profiles: Vec::new(),
            generic: GenericProfile::new(),
        }
    }

    /// Registry with the built-in source profiles.
    pub fn with_default_profiles() -> Self {
        Self {
            profiles: vec![Box::new(TescoProfile), Box::new(RicoProfile)],
            generic: GenericProfile::new(),
        }
    }

    /// Add a profile ahead of registry use (builder style).
    pub fn with_profile(mut self, profile: Box<dyn SourceProfile>) -> Self {
        self.profiles.push(profile);
        self
    }

    /// First matching profile, or the generic fallback.
    pub fn resolve(&self, source: &SourceContext) -> &dyn SourceProfile {
        self.profiles
            .iter()
            .find(|p| p.matches(source))
            .map(|p| p.as_ref())
            .unwrap_or(&self.generic)
    }

    /// Normalize one segment, degrading to the generic profile when an
    /// override fails. The document is never aborted from here.
    pub fn normalize_job(
        &self,
        source: &SourceContext,
        segment: &JobSegment,
        date: NaiveDate,
    ) -> JobRecord {
        let profile = self.resolve(source);
        trace!("Profile {} for job {}", profile.name(), segment.job_number);

        match profile.normalize(segment, date) {
            Ok(mut record) => {
                record.diagnostics.profile = Some(profile.name().to_string());
                record
            }
            Err(e) => {
                warn!(
                    "Override {} failed for job {}: {}; using generic normalizers",
                    profile.name(),
                    segment.job_number,
                    e
                );
                let mut record = self.generic.build(segment, date);
                record.diagnostics.profile = Some(self.generic.name().to_string());
                record
                    .diagnostics
                    .warnings
                    .push(format!("{} override failed: {}", profile.name(), e));
                record
            }
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_profiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    fn segment(header: &str, body: &[&str]) -> JobSegment {
        JobSegment {
            job_number: "4269797".to_string(),
            header: header.to_string(),
            body: body.iter().map(|s| s.to_string()).collect(),
            notes: Vec::new(),
            start_row: 0,
        }
    }

    fn tesco_source() -> SourceContext {
        SourceContext {
            driver: None,
            customer: Some("Tesco North West".to_string()),
        }
    }

    #[test]
    fn test_generic_normalization() {
        let seg = segment("TESCO STORE 16661UK MANCHESTER M1 1AA TECH EXCHANGE", &[]);
        let record = GenericProfile::new().build(&seg, date());

        assert_eq!(record.job_number, "4269797");
        assert_eq!(record.customer, Some("TESCO STORE".to_string()));
        assert_eq!(record.postcode, Some("M1 1AA".to_string()));
        assert_eq!(record.activity, Some("TECH EXCHANGE".to_string()));
        assert_eq!(record.address, Some("MANCHESTER".to_string()));
    }

    #[test]
    fn test_registry_dispatches_first_match() {
        let registry = ParserRegistry::with_default_profiles();
        let seg = segment("TESCO STORE 16661UK MANCHESTER M1 1AA SURVEY", &[]);

        let record = registry.normalize_job(&tesco_source(), &seg, date());
        assert_eq!(record.customer, Some("TESCO STORE 16661".to_string()));
        assert_eq!(record.diagnostics.profile, Some("tesco".to_string()));
    }

    #[test]
    fn test_override_failure_degrades_to_generic() {
        let registry = ParserRegistry::with_default_profiles();
        // No store ref anywhere: the tesco override reports MissingField.
        let seg = segment("TESCO EXPRESS DIDSBURY M20 2RN SURVEY", &[]);

        let record = registry.normalize_job(&tesco_source(), &seg, date());
        assert_eq!(record.diagnostics.profile, Some("generic".to_string()));
        assert_eq!(record.customer, Some("TESCO EXPRESS DIDSBURY".to_string()));
        assert!(record.diagnostics.warnings.iter().any(|w| w.contains("tesco")));
    }

    #[test]
    fn test_unmatched_source_falls_through() {
        let registry = ParserRegistry::with_default_profiles();
        let source = SourceContext {
            driver: Some("JONES".to_string()),
            customer: None,
        };
        let seg = segment("WILKO BURY BL9 0EQ MAINTENANCE", &[]);

        let record = registry.normalize_job(&source, &seg, date());
        assert_eq!(record.diagnostics.profile, Some("generic".to_string()));
        assert_eq!(record.customer, Some("WILKO BURY".to_string()));
    }

    #[test]
    fn test_rico_reshapes_slash_addresses() {
        let registry = ParserRegistry::with_default_profiles();
        let source = SourceContext {
            driver: Some("RICO-07".to_string()),
            customer: None,
        };
        let seg = segment("", &["UNIT 9 / SALFORD QUAYS / SALFORD M50 3AZ"]);

        let record = registry.normalize_job(&source, &seg, date());
        assert_eq!(record.customer, Some("RICO".to_string()));
        assert_eq!(record.postcode, Some("M50 3AZ".to_string()));
        assert_eq!(
            record.address,
            Some("UNIT 9, SALFORD QUAYS, SALFORD".to_string())
        );
    }
}
