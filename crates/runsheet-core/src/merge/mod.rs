//! Merge/reconciliation of parsed candidates with persisted records.
//!
//! Re-parsing must never destroy business fields a human has already set:
//! matched candidates inherit the existing record's protected fields,
//! records with unreadable protected fields are left untouched and flagged,
//! and nothing existing is removed unless replace-all is explicitly
//! requested.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{MergeError, Result, StoreError};
use crate::models::job::{DocumentKey, DocumentState, ParseResult, PersistedJobRecord};

/// Persistence boundary consumed by the merge engine.
///
/// `upsert` must be all-or-nothing for the given key; a failed write leaves
/// the previous record set intact.
pub trait JobStore: Send + Sync {
    /// Load the existing records for a document key.
    fn get_existing(&self, key: &DocumentKey) -> std::result::Result<Vec<PersistedJobRecord>, StoreError>;

    /// Replace the record set for a document key atomically.
    fn upsert(
        &self,
        key: &DocumentKey,
        records: &[PersistedJobRecord],
    ) -> std::result::Result<(), StoreError>;
}

/// How a merge treats the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Compute the outcome without persisting anything.
    #[default]
    Preview,
    /// Persist; existing records without a matching candidate are kept.
    Append,
    /// Persist; existing records without a matching candidate are dropped.
    Replace,
}

impl MergeMode {
    /// Parse from a CLI/config string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "preview" | "dry-run" => Some(MergeMode::Preview),
            "append" | "append-only" => Some(MergeMode::Append),
            "replace" | "replace-all" => Some(MergeMode::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Preview => "preview",
            MergeMode::Append => "append",
            MergeMode::Replace => "replace",
        }
    }
}

/// Outcome of merging one document.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The record set after the merge (what was or would be persisted).
    pub records: Vec<PersistedJobRecord>,

    /// Candidates that replaced an existing record, protected fields
    /// carried over.
    pub updated: usize,

    /// Candidates inserted as new records.
    pub inserted: usize,

    /// Existing records kept without a matching candidate.
    pub untouched: usize,

    /// Existing records left as-is and flagged for manual review.
    pub flagged: usize,

    /// Existing records dropped by replace-all.
    pub removed: usize,

    /// State the document reached.
    pub state: DocumentState,

    /// Whether the outcome was written to the store.
    pub persisted: bool,
}

/// Per-key lock table serializing merges for the same `(date, source)`.
struct KeyedLocks {
    inner: Mutex<HashMap<DocumentKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn acquire(&self, key: &DocumentKey) -> Arc<Mutex<()>> {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(key.clone()).or_default().clone()
    }
}

/// Merge/reconciliation engine over a job store.
pub struct MergeEngine<S: JobStore> {
    store: S,
    locks: KeyedLocks,
}

impl<S: JobStore> MergeEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Merge a scored parse result into the persisted record set for `key`.
    ///
    /// Store failure is fatal for this document only; the caller logs it
    /// and the batch proceeds.
    pub fn merge(
        &self,
        key: &DocumentKey,
        result: &ParseResult,
        mode: MergeMode,
    ) -> Result<MergeOutcome> {
        if result.state != DocumentState::Scored {
            return Err(MergeError::NotMergeable(result.state.name()).into());
        }

        // Serialize all merge/persist work for this key.
        let lock = self.locks.acquire(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let existing = self.store.get_existing(key)?;
        debug!(
            "Merging {} candidates into {} existing records for {}",
            result.accepted.len(),
            existing.len(),
            key
        );

        let mut by_number: HashMap<&str, &PersistedJobRecord> = existing
            .iter()
            .map(|r| (r.record.job_number.as_str(), r))
            .collect();

        let mut outcome = MergeOutcome {
            records: Vec::with_capacity(result.accepted.len() + existing.len()),
            updated: 0,
            inserted: 0,
            untouched: 0,
            flagged: 0,
            removed: 0,
            state: result.state,
            persisted: false,
        };

        for candidate in &result.accepted {
            match by_number.remove(candidate.job_number.as_str()) {
                Some(previous) if previous.protected.is_none() => {
                    // Protected fields unreadable: never replace the record,
                    // flag it for a human instead.
                    warn!(
                        "Job {} has unreadable protected fields; left untouched",
                        candidate.job_number
                    );
                    let mut kept = previous.clone();
                    kept.needs_review = true;
                    outcome.records.push(kept);
                    outcome.flagged += 1;
                }
                Some(previous) => {
                    outcome.records.push(PersistedJobRecord {
                        record: candidate.clone(),
                        protected: previous.protected.clone(),
                        needs_review: previous.needs_review,
                    });
                    outcome.updated += 1;
                }
                None => {
                    outcome.records.push(PersistedJobRecord::inserted(candidate.clone()));
                    outcome.inserted += 1;
                }
            }
        }

        // Existing records with no matching candidate.
        for previous in existing.iter() {
            if !by_number.contains_key(previous.record.job_number.as_str()) {
                continue;
            }
            if mode == MergeMode::Replace {
                outcome.removed += 1;
            } else {
                outcome.records.push(previous.clone());
                outcome.untouched += 1;
            }
        }

        let merged_state = if existing.is_empty() {
            DocumentState::Inserted
        } else {
            DocumentState::Merged
        };
        outcome.state = outcome.state.advance(merged_state)?;

        if mode != MergeMode::Preview {
            self.store.upsert(key, &outcome.records)?;
            outcome.persisted = true;
            outcome.state = outcome.state.advance(DocumentState::Persisted)?;
        }

        info!(
            "Merge {} ({}): {} updated, {} inserted, {} untouched, {} flagged, {} removed",
            key,
            mode.as_str(),
            outcome.updated,
            outcome.inserted,
            outcome.untouched,
            outcome.flagged,
            outcome.removed
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{JobRecord, JobStatus, ProtectedFields};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    /// In-memory store for merge tests.
    #[derive(Default)]
    struct MemoryStore {
        data: Mutex<HashMap<DocumentKey, Vec<PersistedJobRecord>>>,
        fail_writes: bool,
    }

    impl JobStore for MemoryStore {
        fn get_existing(
            &self,
            key: &DocumentKey,
        ) -> std::result::Result<Vec<PersistedJobRecord>, StoreError> {
            Ok(self
                .data
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_default())
        }

        fn upsert(
            &self,
            key: &DocumentKey,
            records: &[PersistedJobRecord],
        ) -> std::result::Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::WriteFailed("store offline".to_string()));
            }
            self.data
                .lock()
                .unwrap()
                .insert(key.clone(), records.to_vec());
            Ok(())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    fn key() -> DocumentKey {
        DocumentKey {
            date: date(),
            source: "JONES".to_string(),
        }
    }

    fn candidate(job_number: &str, activity: &str) -> JobRecord {
        let mut record = JobRecord::new(job_number, date());
        record.customer = Some("TESCO STORE".to_string());
        record.activity = Some(activity.to_string());
        record
    }

    fn scored(accepted: Vec<JobRecord>) -> ParseResult {
        ParseResult {
            accepted,
            rejected_count: 0,
            filtered_count: 0,
            completeness_score: 1.0,
            strategy: "line".to_string(),
            state: DocumentState::Scored,
            warnings: Vec::new(),
        }
    }

    fn existing_completed(job_number: &str) -> PersistedJobRecord {
        PersistedJobRecord {
            record: candidate(job_number, "SURVEY"),
            protected: Some(ProtectedFields {
                status: JobStatus::Completed,
                pay_amount: Some(Decimal::new(4500, 2)),
                pay_linkage: Some("PAYRUN-2024-11".to_string()),
                manual_notes: None,
            }),
            needs_review: false,
        }
    }

    #[test]
    fn test_reparse_preserves_protected_fields() {
        let store = MemoryStore::default();
        store
            .data
            .lock()
            .unwrap()
            .insert(key(), vec![existing_completed("4316807")]);

        let engine = MergeEngine::new(store);
        // Re-parse produced a different activity and address.
        let mut changed = candidate("4316807", "TECH EXCHANGE");
        changed.address = Some("NEW ADDRESS".to_string());

        let outcome = engine
            .merge(&key(), &scored(vec![changed]), MergeMode::Append)
            .unwrap();

        assert_eq!(outcome.updated, 1);
        let merged = &outcome.records[0];
        assert_eq!(merged.record.activity.as_deref(), Some("TECH EXCHANGE"));
        assert_eq!(merged.record.address.as_deref(), Some("NEW ADDRESS"));

        let protected = merged.protected.as_ref().unwrap();
        assert_eq!(protected.status, JobStatus::Completed);
        assert_eq!(protected.pay_amount, Some(Decimal::new(4500, 2)));
        assert_eq!(protected.pay_linkage.as_deref(), Some("PAYRUN-2024-11"));
    }

    #[test]
    fn test_new_candidates_inserted() {
        let engine = MergeEngine::new(MemoryStore::default());
        let outcome = engine
            .merge(
                &key(),
                &scored(vec![candidate("4269797", "SURVEY")]),
                MergeMode::Append,
            )
            .unwrap();

        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.state, DocumentState::Persisted);
        assert_eq!(
            outcome.records[0].protected.as_ref().unwrap().status,
            JobStatus::Pending
        );
    }

    #[test]
    fn test_unmatched_existing_kept_unless_replace() {
        let store = MemoryStore::default();
        store
            .data
            .lock()
            .unwrap()
            .insert(key(), vec![existing_completed("4316807")]);
        let engine = MergeEngine::new(store);

        let result = scored(vec![candidate("4269797", "SURVEY")]);

        let outcome = engine.merge(&key(), &result, MergeMode::Append).unwrap();
        assert_eq!(outcome.untouched, 1);
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.records.len(), 2);

        let outcome = engine.merge(&key(), &result, MergeMode::Replace).unwrap();
        assert_eq!(outcome.untouched, 0);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_unreadable_protected_flagged_and_untouched() {
        let store = MemoryStore::default();
        let mut unreadable = existing_completed("4316807");
        unreadable.protected = None;
        store.data.lock().unwrap().insert(key(), vec![unreadable]);
        let engine = MergeEngine::new(store);

        let mut changed = candidate("4316807", "TECH EXCHANGE");
        changed.address = Some("NEW ADDRESS".to_string());

        let outcome = engine
            .merge(&key(), &scored(vec![changed]), MergeMode::Append)
            .unwrap();

        assert_eq!(outcome.flagged, 1);
        assert_eq!(outcome.updated, 0);
        let kept = &outcome.records[0];
        assert!(kept.needs_review);
        // The old record survived, not the re-parsed candidate.
        assert_eq!(kept.record.activity.as_deref(), Some("SURVEY"));
    }

    #[test]
    fn test_preview_never_writes() {
        let store = MemoryStore::default();
        let engine = MergeEngine::new(store);

        let outcome = engine
            .merge(
                &key(),
                &scored(vec![candidate("4269797", "SURVEY")]),
                MergeMode::Preview,
            )
            .unwrap();

        assert!(!outcome.persisted);
        assert_eq!(outcome.state, DocumentState::Inserted);
        assert!(engine.store().data.lock().unwrap().is_empty());
    }

    #[test]
    fn test_store_failure_is_an_error() {
        let store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let engine = MergeEngine::new(store);

        let err = engine
            .merge(
                &key(),
                &scored(vec![candidate("4269797", "SURVEY")]),
                MergeMode::Append,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::RunsheetError::Store(StoreError::WriteFailed(_))
        ));
    }

    #[test]
    fn test_unscored_document_not_mergeable() {
        let engine = MergeEngine::new(MemoryStore::default());
        let mut result = scored(Vec::new());
        result.state = DocumentState::Rejected;

        assert!(engine.merge(&key(), &result, MergeMode::Preview).is_err());
    }
}
