//! Activity recognition against the canonical vocabulary.

use super::patterns::{CANONICAL_ACTIVITIES, PARTIAL_ACTIVITY_MAP};
use super::{FieldRule, RuleMatch};

/// Activity recognizer.
///
/// Exact vocabulary match first; failing that, the fixed partial-term map.
/// Beyond the map nothing is ever guessed.
pub struct ActivityRecognizer;

impl ActivityRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Recognize across several lines, first hit wins.
    pub fn recognize_from_lines<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Option<RuleMatch<String>> {
        let lines: Vec<&str> = lines.into_iter().collect();

        // A full exact match anywhere beats a partial match earlier on.
        for line in &lines {
            if let Some(m) = exact_match(line) {
                return Some(m);
            }
        }
        lines.iter().find_map(|line| partial_match(line))
    }
}

impl Default for ActivityRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for ActivityRecognizer {
    type Output = RuleMatch<String>;

    fn apply(&self, text: &str) -> Option<Self::Output> {
        exact_match(text).or_else(|| partial_match(text))
    }
}

fn exact_match(text: &str) -> Option<RuleMatch<String>> {
    let upper = text.to_uppercase();
    CANONICAL_ACTIVITIES
        .iter()
        .filter_map(|label| upper.find(label).map(|pos| (pos, *label)))
        .max_by_key(|(_, label)| label.len())
        .map(|(pos, label)| {
            RuleMatch::new(label.to_string(), label).with_position(pos, pos + label.len())
        })
}

fn partial_match(text: &str) -> Option<RuleMatch<String>> {
    let upper = text.to_uppercase();
    for (term, label) in PARTIAL_ACTIVITY_MAP {
        if let Some(pos) = upper.find(term) {
            // Partial terms only match at token starts, so "REPAIR" inside
            // "DISREPAIR" does not fire.
            let at_token_start = pos == 0
                || upper[..pos]
                    .chars()
                    .next_back()
                    .map(|c| !c.is_alphanumeric())
                    .unwrap_or(true);
            if at_token_start {
                return Some(
                    RuleMatch::new(label.to_string(), *term).with_position(pos, pos + term.len()),
                );
            }
        }
    }
    None
}

/// Recognize an activity in a single piece of text.
pub fn recognize_activity(text: &str) -> Option<String> {
    ActivityRecognizer::new().apply(text).map(|m| m.value)
}
