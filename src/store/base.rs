use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore, no_store::NoStore};
use crate::config::PersistenceConfig;
use crate::models::PersistedSession;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("session storage is disabled")]
    Disabled,
}

/// The SessionPersistence trait abstracts where the session snapshot lives between processes.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Returns the stored snapshot, or `None` when nothing was ever written.
    async fn load(&self) -> Result<Option<PersistedSession>, PersistenceError>;
    async fn save(&self, session: &PersistedSession) -> Result<(), PersistenceError>;
    async fn clear(&self) -> Result<(), PersistenceError>;
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Creates a concrete persistence backend from the PersistenceConfig.
pub fn create_persistence(config: &PersistenceConfig) -> Arc<dyn SessionPersistence> {
    match config {
        PersistenceConfig::File(file) => {
            info!(path = file.path.as_str(), key = file.key.as_str(), "Using file session storage.");
            Arc::new(FileStore::new(&file.path, &file.key))
        }
        PersistenceConfig::Memory => {
            info!("Using in-memory session storage.");
            Arc::new(MemoryStore::new())
        }
        PersistenceConfig::Disabled => {
            info!("Session storage is disabled. Using NoStore.");
            Arc::new(NoStore::new())
        }
    }
}
