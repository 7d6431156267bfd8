use thiserror::Error;

/// Failures surfaced by session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Transport failure reaching the auth service. Never retried automatically.
    #[error("could not reach the auth service: {0}")]
    Network(String),
    #[error("the auth service did not answer in time")]
    Timeout,
    /// Login rejected; shown inline on the form.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    /// Refresh rejected; fatal for the current session.
    #[error("session expired or invalid: {0}")]
    ExpiredOrInvalidSession(String),
    #[error("auth service error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("there is no session to refresh")]
    NotAuthenticated,
    /// The call completed after a newer login or logout and was discarded.
    #[error("superseded by a newer session change")]
    Superseded,
}
