//! Idempotency guard: fingerprints and the store trait.
//!
//! A [`Fingerprint`] is derived from immutable request inputs only. Callers
//! compute it, look it up before any side effect, and record it exactly once
//! after the side effect completed.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// SHA-256 over the parts, each length-prefixed so `["ab","c"]` and
    /// `["a","bc"]` never collide.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            let bytes = part.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(bytes);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to what a completed run produced, e.g. a merge-request URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorResult(pub String);

impl std::fmt::Display for PriorResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistent `fingerprint → prior result` mapping with read-your-writes
/// consistency inside one process. Records are never updated.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<PriorResult>, StoreError>;

    /// Fails with [`StoreError::AlreadyRecorded`] if the fingerprint exists.
    async fn record(&self, fingerprint: &Fingerprint, result: PriorResult) -> Result<(), StoreError>;
}
