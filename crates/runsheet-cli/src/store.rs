//! JSON-file-backed job store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use runsheet_core::{DocumentKey, JobStore, PersistedJobRecord, StoreError};
use tracing::debug;

/// Whole-file JSON store keyed by `date/source`.
///
/// Writes go to a temporary file followed by a rename, so an interrupted
/// write leaves the previous record set intact (all-or-nothing per
/// document). File access is serialized internally; the merge engine
/// additionally serializes per document key.
pub struct JsonFileStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

type StoreData = HashMap<String, Vec<PersistedJobRecord>>;

impl JsonFileStore {
    /// Open a store at the given path; the file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// Default store location under the user data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("runsheet")
            .join("jobs.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<StoreData, StoreError> {
        if !self.path.exists() {
            return Ok(StoreData::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_all(&self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::WriteFailed(format!("{}: {}", parent.display(), e)))?;
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl JobStore for JsonFileStore {
    fn get_existing(&self, key: &DocumentKey) -> Result<Vec<PersistedJobRecord>, StoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let data = self.read_all()?;
        Ok(data.get(&key.to_string()).cloned().unwrap_or_default())
    }

    fn upsert(
        &self,
        key: &DocumentKey,
        records: &[PersistedJobRecord],
    ) -> Result<(), StoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut data = self.read_all()?;
        data.insert(key.to_string(), records.to_vec());
        self.write_all(&data)?;
        debug!("Persisted {} records under {}", records.len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use runsheet_core::JobRecord;

    fn key() -> DocumentKey {
        DocumentKey {
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            source: "JONES".to_string(),
        }
    }

    fn record(job_number: &str) -> PersistedJobRecord {
        let mut record = JobRecord::new(job_number, key().date);
        record.customer = Some("TESCO STORE".to_string());
        PersistedJobRecord::inserted(record)
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("jobs.json"));

        assert!(store.get_existing(&key()).unwrap().is_empty());

        store.upsert(&key(), &[record("4269797")]).unwrap();
        let loaded = store.get_existing(&key()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].record.job_number, "4269797");
    }

    #[test]
    fn test_upsert_replaces_key_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("jobs.json"));

        let other = DocumentKey {
            date: key().date,
            source: "PATEL".to_string(),
        };
        store.upsert(&key(), &[record("4269797")]).unwrap();
        store.upsert(&other, &[record("4316807")]).unwrap();
        store.upsert(&key(), &[record("4000001")]).unwrap();

        assert_eq!(store.get_existing(&key()).unwrap()[0].record.job_number, "4000001");
        assert_eq!(store.get_existing(&other).unwrap()[0].record.job_number, "4316807");
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert!(matches!(
            store.get_existing(&key()),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
