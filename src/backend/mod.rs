//! The external auth collaborator consumed by the session store.

pub mod http_backend;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::session::AuthError;

pub use http_backend::HttpAuthBackend;

/// Email/password pair submitted by the login form.
#[derive(Serialize, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RefreshResponse {
    pub token: String,
    /// Some backends send a fresh profile along with the rotated token.
    #[serde(default)]
    pub user: Option<User>,
}

/// An auth backend establishes, rotates and invalidates session tokens.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    fn get_name(&self) -> &str;
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;
    /// Exchanges the current token for a new one without re-entering credentials.
    async fn refresh(&self, token: &str) -> Result<RefreshResponse, AuthError>;
    /// Server-side invalidation. Callers treat failures as best-effort.
    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError>;
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;
}
