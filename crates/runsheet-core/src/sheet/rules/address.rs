//! Address cleaning and combining.

use super::patterns::{
    CONTACT_LINE, DO_NOT_INVOICE, INSTRUCTION, LEADING_NONWORD, POSTCODE, SECTION_END, STORE_REF,
    TRAILING_NONWORD,
};
use super::{FieldRule, RuleMatch};

/// Address cleaner/combiner.
///
/// Drops lines classified as contact-name-only, instruction-only or
/// reference-code noise, cleans the survivors, and joins them in original
/// order. The postcode is carried in its own field and is removed from the
/// combined address.
pub struct AddressCombiner;

impl AddressCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Combine fragments into one comma-joined address.
    pub fn combine<'a>(&self, fragments: impl IntoIterator<Item = &'a str>) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        for fragment in fragments {
            if CONTACT_LINE.is_match(fragment)
                || INSTRUCTION.is_match(fragment)
                || SECTION_END.is_match(fragment)
            {
                continue;
            }

            let Some(cleaned) = self.apply(fragment) else {
                continue;
            };

            // Duplicate adjacent fragments collapse to one.
            let duplicate = parts
                .last()
                .map(|last| last.eq_ignore_ascii_case(&cleaned.value))
                .unwrap_or(false);
            if !duplicate {
                parts.push(cleaned.value);
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl Default for AddressCombiner {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for AddressCombiner {
    type Output = RuleMatch<String>;

    /// Clean a single address fragment.
    fn apply(&self, text: &str) -> Option<Self::Output> {
        let mut cleaned = DO_NOT_INVOICE.replace_all(text, "").to_string();
        cleaned = STORE_REF.replace_all(&cleaned, "").to_string();
        cleaned = POSTCODE.replace_all(&cleaned, "").to_string();
        cleaned = LEADING_NONWORD.replace(&cleaned, "").to_string();
        cleaned = TRAILING_NONWORD.replace(&cleaned, "").to_string();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        if cleaned.is_empty() {
            None
        } else {
            Some(RuleMatch::new(cleaned, text))
        }
    }
}

/// Combine address fragments with the default rules.
pub fn combine_address<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Option<String> {
    AddressCombiner::new().combine(fragments)
}
