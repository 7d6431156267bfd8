use super::{PersistenceError, SessionPersistence};
use crate::models::PersistedSession;
use async_trait::async_trait;

/// A no-op storage: nothing is ever found and every write is refused,
/// so each process starts logged out.
pub struct NoStore;

impl NoStore {
    pub fn new() -> Self {
        NoStore
    }
}

impl Default for NoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionPersistence for NoStore {
    async fn load(&self) -> Result<Option<PersistedSession>, PersistenceError> {
        Ok(None)
    }

    async fn save(&self, _session: &PersistedSession) -> Result<(), PersistenceError> {
        Err(PersistenceError::Disabled)
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
