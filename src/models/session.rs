use serde::{Deserialize, Serialize};

use super::user::User;

/// Immutable view of the session published after every store mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_hydrated: bool,
    pub is_loading: bool,
}

impl SessionSnapshot {
    /// Authenticated and still holding a token. Only meaningful once hydrated.
    pub fn has_session(&self) -> bool {
        self.is_authenticated && self.token.is_some()
    }

    /// The part of the snapshot that survives a restart.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            token: self.token.clone(),
            user: self.user.clone(),
            is_authenticated: self.is_authenticated,
        }
    }
}

/// Serialized `{ token, user, isAuthenticated }` record kept in persisted storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl PersistedSession {
    /// A snapshot is only worth restoring when it claims a session and has the token for it.
    pub fn is_restorable(&self) -> bool {
        self.is_authenticated && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
