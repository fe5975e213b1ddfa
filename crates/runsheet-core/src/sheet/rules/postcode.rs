//! UK postcode extraction and canonical formatting.

use super::patterns::{INSTRUCTION, POSTCODE};
use super::{FieldRule, RuleMatch};

/// Postcode field extractor.
pub struct PostcodeExtractor;

impl PostcodeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract from several lines, skipping instruction lines.
    pub fn extract_from_lines<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Option<RuleMatch<String>> {
        lines
            .into_iter()
            .filter(|line| !INSTRUCTION.is_match(line))
            .find_map(|line| self.apply(line))
    }
}

impl Default for PostcodeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for PostcodeExtractor {
    type Output = RuleMatch<String>;

    fn apply(&self, text: &str) -> Option<Self::Output> {
        let caps = POSTCODE.captures(text)?;
        let outward = caps[1].to_uppercase();
        let inward = caps[2].to_uppercase();
        let full_match = caps.get(0)?;

        Some(
            RuleMatch::new(format!("{} {}", outward, inward), full_match.as_str())
                .with_position(full_match.start(), full_match.end()),
        )
    }
}

/// Extract the first postcode from a non-instruction line.
pub fn extract_postcode(text: &str) -> Option<String> {
    if INSTRUCTION.is_match(text) {
        return None;
    }
    PostcodeExtractor::new().apply(text).map(|m| m.value)
}

/// Canonicalize an already-isolated postcode string.
///
/// Any spacing variant of a valid UK postcode normalizes to the same
/// "OUTWARD INWARD" form; anything else comes back unchanged.
pub fn canonical_postcode(raw: &str) -> String {
    match PostcodeExtractor::new().apply(raw) {
        Some(m) => m.value,
        None => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserts_missing_space() {
        assert_eq!(extract_postcode("M11AA"), Some("M1 1AA".to_string()));
        assert_eq!(extract_postcode("SW1A0AA"), Some("SW1A 0AA".to_string()));
    }

    #[test]
    fn test_canonical_form_is_stable() {
        for input in ["M1 1AA", "M11AA", "m1 1aa", "M1  1AA", " M11AA "] {
            assert_eq!(canonical_postcode(input), "M1 1AA", "input {input:?}");
        }
    }

    #[test]
    fn test_matches_anywhere_in_line() {
        assert_eq!(
            extract_postcode("UNIT 4 TRAFFORD PARK M17 1WA REAR DOOR"),
            Some("M17 1WA".to_string())
        );
    }

    #[test]
    fn test_skips_instruction_lines() {
        assert_eq!(extract_postcode("PLEASE POST KEYS TO M1 1AA"), None);

        let extractor = PostcodeExtractor::new();
        let found = extractor.extract_from_lines(["NOTE: gate code 4421", "SALFORD M50 2EQ"]);
        assert_eq!(found.unwrap().value, "M50 2EQ");
    }

    #[test]
    fn test_non_postcode_passthrough() {
        assert_eq!(canonical_postcode("DEPOT"), "DEPOT");
    }
}
