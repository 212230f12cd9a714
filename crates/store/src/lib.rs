//! Idempotency record stores for Ticketsmith.
//!
//! All stores implement `ticketsmith_core::IdempotencyStore`.
//! [`from_config`] selects one from `[store]` settings.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

use std::sync::Arc;
use ticketsmith_config::{StoreBackend, StoreConfig};
use ticketsmith_core::{IdempotencyStore, StoreError};

/// Build the configured store.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn IdempotencyStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::open(config.resolved_path())?)),
    }
}
