use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Client-side session settings: backend, persisted storage, refresh loop.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// The external auth REST service.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound for any single backend call.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    /// Cookie the backend uses to carry the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            timeout_in_ms: default_timeout_in_ms(),
            cookie_name: default_cookie_name(),
        }
    }
}

/// Where the session snapshot survives between processes.
/// Selected through a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(tag = "type")]
pub enum PersistenceConfig {
    #[serde(rename = "file")]
    File(FilePersistenceConfig),
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FilePersistenceConfig {
    pub path: String,
    /// Storage key the snapshot is written under.
    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RefreshConfig {
    /// Fixed refresh period; 50 minutes keeps inside a 60 minute token lifetime.
    #[serde(default = "default_refresh_interval")]
    pub interval_in_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_in_secs: default_refresh_interval(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_in_ms() -> u64 {
    30_000
}

fn default_cookie_name() -> String {
    "jwtToken".to_string()
}

pub(crate) fn default_storage_key() -> String {
    "auth-storage".to_string()
}

fn default_refresh_interval() -> u64 {
    50 * 60
}
