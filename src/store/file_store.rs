use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use super::{PersistenceError, SessionPersistence};
use crate::models::PersistedSession;

const FORMAT_VERSION: u32 = 0;

/// Versioned wrapper stored under the storage key.
#[derive(Serialize, Deserialize)]
struct Envelope {
    state: PersistedSession,
    #[serde(default)]
    version: u32,
}

/// A JSON key/value document on disk. The session lives under one key;
/// other keys in the same file are left alone.
pub struct FileStore {
    path: PathBuf,
    key: String,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>, key: impl Into<String>) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
            key: key.into(),
        }
    }

    async fn read_document(&self) -> Result<Option<Map<String, Value>>, PersistenceError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        // Write-then-rename so a crash never leaves half a document behind.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(document)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionPersistence for FileStore {
    async fn load(&self) -> Result<Option<PersistedSession>, PersistenceError> {
        let Some(mut document) = self.read_document().await? else {
            debug!(path = %self.path.display(), "No session file found.");
            return Ok(None);
        };
        match document.remove(&self.key) {
            Some(value) => {
                let envelope: Envelope = serde_json::from_value(value)?;
                Ok(Some(envelope.state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), PersistenceError> {
        // A corrupt document is replaced rather than blocking every future write.
        let mut document = self.read_document().await.ok().flatten().unwrap_or_default();
        let envelope = Envelope {
            state: session.clone(),
            version: FORMAT_VERSION,
        };
        document.insert(self.key.clone(), serde_json::to_value(envelope)?);
        self.write_document(&document).await
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        let Some(mut document) = self.read_document().await.ok().flatten() else {
            return Ok(());
        };
        if document.remove(&self.key).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }
}
