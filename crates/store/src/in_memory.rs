//! In-memory idempotency store. Records live as long as the process.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use ticketsmith_core::{Fingerprint, IdempotencyStore, PriorResult, StoreError};

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<Fingerprint, PriorResult>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<PriorResult>, StoreError> {
        Ok(self.records.read().await.get(fingerprint).cloned())
    }

    async fn record(&self, fingerprint: &Fingerprint, result: PriorResult) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(fingerprint) {
            return Err(StoreError::AlreadyRecorded(fingerprint.to_string()));
        }
        records.insert(fingerprint.clone(), result);
        Ok(())
    }
}
