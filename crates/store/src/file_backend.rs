//! File-based idempotency store: a single JSON map on disk.
//!
//! The whole map is loaded on open and rewritten on every record. Writes go
//! to a sibling temp file that is then renamed over the original, so a crash
//! never leaves a half-written map behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use ticketsmith_core::{Fingerprint, IdempotencyStore, PriorResult, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    result: PriorResult,
    recorded_at: DateTime<Utc>,
}

pub struct FileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<Fingerprint, StoredRecord>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// or corrupt one is an error, never silently discarded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), count = records.len(), "File idempotency store loaded");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<BTreeMap<Fingerprint, StoredRecord>, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
    }

    async fn flush(&self, records: &BTreeMap<Fingerprint, StoredRecord>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(format!("Failed to create store directory: {e}")))?;
        }

        let body = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Io(format!("Failed to serialize store: {e}")))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to replace {}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<PriorResult>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .get(fingerprint)
            .map(|r| r.result.clone()))
    }

    async fn record(&self, fingerprint: &Fingerprint, result: PriorResult) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(fingerprint) {
            return Err(StoreError::AlreadyRecorded(fingerprint.to_string()));
        }
        records.insert(
            fingerprint.clone(),
            StoredRecord {
                result,
                recorded_at: Utc::now(),
            },
        );
        if let Err(e) = self.flush(&records).await {
            records.remove(fingerprint);
            return Err(e);
        }
        debug!(fingerprint = %fingerprint, "Idempotency record persisted");
        Ok(())
    }
}
