//! Customer-name cleaning.

use super::activity::ActivityRecognizer;
use super::patterns::{
    DO_NOT_INVOICE, INDEX_TOKEN, LEADING_NONWORD, POSTCODE, SECTION_END, STORE_REF,
    TRAILING_NONWORD,
};
use super::{FieldRule, RuleMatch};

/// Customer-name cleaner.
///
/// Works on the header remainder after the job number: the customer name is
/// everything up to the first store/reference code, postcode or activity
/// token, with known artifacts stripped out.
pub struct CustomerCleaner;

impl CustomerCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CustomerCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRule for CustomerCleaner {
    type Output = RuleMatch<String>;

    fn apply(&self, text: &str) -> Option<Self::Output> {
        let source = text.to_string();

        let mut cleaned = DO_NOT_INVOICE.replace_all(text, "").to_string();
        cleaned = SECTION_END.replace_all(&cleaned, "").to_string();
        cleaned = INDEX_TOKEN.replace(&cleaned, "").to_string();

        // Truncate at the first token that belongs to another field.
        if let Some(cut) = cut_position(&cleaned) {
            if cleaned.is_char_boundary(cut) {
                cleaned.truncate(cut);
            }
        }

        cleaned = LEADING_NONWORD.replace(&cleaned, "").to_string();
        cleaned = TRAILING_NONWORD.replace(&cleaned, "").to_string();
        cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        if cleaned.is_empty() {
            None
        } else {
            Some(RuleMatch::new(cleaned.to_uppercase(), source))
        }
    }
}

fn cut_position(text: &str) -> Option<usize> {
    let store = STORE_REF.find(text).map(|m| m.start());
    let postcode = POSTCODE.find(text).map(|m| m.start());
    let activity = ActivityRecognizer::new()
        .apply(text)
        .and_then(|m| m.position)
        .map(|(start, _)| start);

    [store, postcode, activity].into_iter().flatten().min()
}

/// Clean a customer name out of a header remainder.
pub fn clean_customer(text: &str) -> Option<String> {
    CustomerCleaner::new().apply(text).map(|m| m.value)
}

/// Split a header remainder into the cleaned customer name and the tail
/// that follows it (address/postcode/activity territory).
pub fn split_header(header: &str) -> (Option<String>, String) {
    let customer = clean_customer(header);
    let tail = cut_position(header)
        .map(|cut| header[cut..].to_string())
        .unwrap_or_default();
    (customer, tail)
}
