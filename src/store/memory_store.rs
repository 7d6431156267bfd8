use std::sync::Mutex;

use async_trait::async_trait;

use super::{PersistenceError, SessionPersistence};
use crate::models::PersistedSession;

/// Keeps the snapshot for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a snapshot already stored, as if a previous process had written it.
    pub fn with_session(session: PersistedSession) -> Self {
        MemoryStore {
            slot: Mutex::new(Some(session)),
        }
    }

    /// What a fresh process would restore right now.
    pub fn current(&self) -> Option<PersistedSession> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl SessionPersistence for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedSession>, PersistenceError> {
        Ok(self.current())
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), PersistenceError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(session.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}
