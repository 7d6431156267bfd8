//! Session store: the single source of truth for authentication state.
//!
//! Every mutation is published as a [`SessionSnapshot`] on a watch channel and
//! then committed to persisted storage. Network-backed mutations remember the
//! session generation they started from; a completion that arrives after a
//! newer login or logout is dropped instead of resurrecting or clearing the
//! wrong session.

mod error;
#[cfg(test)]
pub(crate) mod test_support;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{AuthBackend, Credentials, HttpAuthBackend};
use crate::config::SessionConfig;
use crate::models::{PersistedSession, SessionSnapshot, User};
use crate::store::{SessionPersistence, create_persistence};

pub use error::AuthError;

#[derive(Default)]
struct Inner {
    token: Option<String>,
    user: Option<User>,
    is_authenticated: bool,
    is_hydrated: bool,
    in_flight: u32,
    logins_in_flight: u32,
    generation: u64,
    restore_started: bool,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token.clone(),
            user: self.user.clone(),
            is_authenticated: self.is_authenticated,
            is_hydrated: self.is_hydrated,
            is_loading: self.in_flight > 0,
        }
    }

    /// Starts a new generation so pending completions from the old one are ignored.
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.is_authenticated = false;
        self.bump();
    }
}

/// Marks a backend call as in flight for as long as it lives.
struct InFlight<'a> {
    store: &'a SessionStore,
    login: bool,
}

impl<'a> InFlight<'a> {
    fn start(store: &'a SessionStore) -> Self {
        store.update(|inner| inner.in_flight += 1);
        InFlight { store, login: false }
    }

    /// A pending login also holds back refresh completions.
    fn login(store: &'a SessionStore) -> Self {
        store.update(|inner| {
            inner.in_flight += 1;
            inner.logins_in_flight += 1;
        });
        InFlight { store, login: true }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let login = self.login;
        self.store.update(|inner| {
            inner.in_flight = inner.in_flight.saturating_sub(1);
            if login {
                inner.logins_in_flight = inner.logins_in_flight.saturating_sub(1);
            }
        });
    }
}

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    persistence: Arc<dyn SessionPersistence>,
    request_timeout: Duration,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<SessionSnapshot>,
    refresh_lock: tokio::sync::Mutex<()>,
    commit_lock: tokio::sync::Mutex<()>,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        persistence: Arc<dyn SessionPersistence>,
        request_timeout: Duration,
    ) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        SessionStore {
            backend,
            persistence,
            request_timeout,
            inner: Mutex::new(Inner::default()),
            snapshots,
            refresh_lock: tokio::sync::Mutex::new(()),
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Wires the HTTP backend and the configured storage together.
    pub fn from_config(config: &SessionConfig) -> Result<Self, AuthError> {
        let backend = Arc::new(HttpAuthBackend::new(&config.backend)?);
        let persistence = create_persistence(&config.persistence);
        Ok(Self::new(
            backend,
            persistence,
            Duration::from_millis(config.backend.timeout_in_ms),
        ))
    }

    /// Name of the auth backend, as reported in log lines.
    pub fn backend_name(&self) -> &str {
        self.backend.get_name()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a mutation and publishes the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner);
        self.snapshots.send_replace(inner.snapshot());
        result
    }

    async fn timed<T>(&self, call: impl Future<Output = Result<T, AuthError>>) -> Result<T, AuthError> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .unwrap_or(Err(AuthError::Timeout))
    }

    /// Writes the current state through to persisted storage.
    async fn commit(&self) {
        let _serial = self.commit_lock.lock().await;
        let snapshot = self.snapshot();
        let result = if snapshot.has_session() {
            self.persistence.save(&snapshot.to_persisted()).await
        } else {
            self.persistence.clear().await
        };
        if let Err(e) = result {
            if self.persistence.is_enabled() {
                warn!(error = %e, "Failed to persist session state");
            } else {
                debug!(error = %e, "Session storage disabled; state kept in memory only");
            }
        }
    }

    /// Loads persisted state into memory. Only the first call does any work;
    /// `is_hydrated` is set once it finishes, whether or not anything was found.
    pub async fn restore(&self) {
        let started_at = self.update(|inner| {
            if inner.restore_started {
                None
            } else {
                inner.restore_started = true;
                Some(inner.generation)
            }
        });
        let Some(generation) = started_at else {
            debug!("Session restore already ran");
            return;
        };

        let loaded = match self.persistence.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Persisted session unreadable; starting unauthenticated");
                None
            }
        };

        self.update(|inner| {
            if inner.generation != generation {
                debug!("Session changed while restoring; keeping the newer state");
            } else if let Some(persisted) = loaded.filter(PersistedSession::is_restorable) {
                inner.token = persisted.token;
                inner.user = persisted.user;
                inner.is_authenticated = true;
                info!("Restored persisted session");
            } else {
                debug!("No persisted session to restore");
            }
            inner.is_hydrated = true;
        });
    }

    /// Establishes a new session. On failure the current state is left untouched.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let generation = self.update(Inner::bump);
        let in_flight = InFlight::login(self);
        let result = self.timed(self.backend.login(credentials)).await;

        let outcome = self.update(|inner| match result {
            Err(e) => Err(e),
            Ok(_) if inner.generation != generation => Err(AuthError::Superseded),
            Ok(response) => {
                inner.bump();
                inner.token = Some(response.token);
                inner.user = Some(response.user.clone());
                inner.is_authenticated = true;
                Ok(response.user)
            }
        });
        drop(in_flight);

        match &outcome {
            Ok(user) => {
                info!(
                    backend = self.backend_name(),
                    user_id = user.id.as_str(),
                    role = ?user.role,
                    "Login succeeded"
                );
                self.commit().await;
            }
            Err(AuthError::Superseded) => debug!("Discarding login completion from a stale generation"),
            Err(e) => info!(backend = self.backend_name(), error = %e, "Login failed"),
        }
        outcome
    }

    /// Rotates the session token. Calls are serialized, so responses apply in call
    /// order. A failure clears the session.
    pub async fn refresh_token(&self) -> Result<(), AuthError> {
        let _serial = self.refresh_lock.lock().await;
        let (generation, token) = {
            let inner = self.lock();
            (inner.generation, inner.token.clone())
        };
        let Some(token) = token else {
            return Err(AuthError::NotAuthenticated);
        };

        let in_flight = InFlight::start(self);
        let result = self.timed(self.backend.refresh(&token)).await;

        let outcome = self.update(|inner| {
            // A newer login decides the session; the old token's fate no longer matters.
            if inner.generation != generation || inner.logins_in_flight > 0 {
                return Err(AuthError::Superseded);
            }
            match result {
                Ok(response) => {
                    inner.token = Some(response.token);
                    if let Some(user) = response.user {
                        inner.user = Some(user);
                    }
                    inner.is_authenticated = true;
                    Ok(())
                }
                Err(e) => {
                    inner.clear();
                    Err(e)
                }
            }
        });
        drop(in_flight);

        match &outcome {
            Ok(()) => debug!("Session token refreshed"),
            Err(AuthError::Superseded) => {
                debug!("Discarding refresh completion from a stale generation");
                return outcome;
            }
            Err(e) => warn!(
                backend = self.backend_name(),
                error = %e,
                "Token refresh failed; session cleared"
            ),
        }
        self.commit().await;
        outcome
    }

    /// Clears the session locally, then asks the backend to invalidate it.
    /// The local clear always wins; backend failures are only logged.
    pub async fn logout(&self) {
        let token = self.update(|inner| {
            let token = inner.token.clone();
            inner.clear();
            token
        });
        self.commit().await;
        info!("Logged out");

        let _in_flight = InFlight::start(self);
        if let Err(e) = self.timed(self.backend.logout(token.as_deref())).await {
            debug!(backend = self.backend_name(), error = %e, "Server-side logout failed; ignoring");
        }
    }

    /// Asks the backend to send a password-reset mail. Session state is untouched.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.timed(self.backend.forgot_password(email)).await
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{ScriptedBackend, authenticated_store, sample_user, store_with};
    use super::*;
    use crate::backend::RefreshResponse;
    use crate::store::{FileStore, MemoryStore};
    use std::sync::atomic::Ordering;

    async fn wait_for_refresh_calls(backend: &ScriptedBackend, expected: usize) {
        while backend.refresh_calls.load(Ordering::SeqCst) < expected {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn restore_twice_matches_restore_once() {
        let persisted = PersistedSession {
            token: Some("persisted".into()),
            user: Some(sample_user()),
            is_authenticated: true,
        };
        let backend = Arc::new(ScriptedBackend::default());
        let store = store_with(backend, Arc::new(MemoryStore::with_session(persisted)));

        assert!(!store.snapshot().is_hydrated);
        store.restore().await;
        let once = store.snapshot();
        store.restore().await;
        let twice = store.snapshot();

        assert_eq!(once, twice);
        assert!(twice.is_hydrated);
        assert!(twice.is_authenticated);
        assert_eq!(twice.token.as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn restore_with_nothing_persisted_still_hydrates() {
        let store = store_with(Arc::new(ScriptedBackend::default()), Arc::new(MemoryStore::new()));
        store.restore().await;
        let snapshot = store.snapshot();
        assert!(snapshot.is_hydrated);
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.token.is_none());
    }

    #[tokio::test]
    async fn corrupt_storage_fails_open_to_unauthenticated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{{{{").expect("seed");

        let store = store_with(
            Arc::new(ScriptedBackend::default()),
            Arc::new(FileStore::new(&path, "auth-storage")),
        );
        store.restore().await;

        let snapshot = store.snapshot();
        assert!(snapshot.is_hydrated);
        assert!(!snapshot.is_authenticated);
    }

    #[tokio::test]
    async fn login_stores_session_and_persists_it() {
        let backend = Arc::new(ScriptedBackend::default());
        let persistence = Arc::new(MemoryStore::new());
        let store = store_with(backend.clone(), persistence.clone());
        store.restore().await;

        let user = store
            .login(&Credentials::new("ada@example.org", "pw"))
            .await
            .expect("login should succeed");

        assert_eq!(user, sample_user());
        let snapshot = store.snapshot();
        assert!(snapshot.is_authenticated);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.token.as_deref(), Some("login-token"));

        let persisted = persistence.current().expect("session should be persisted");
        assert!(persisted.is_authenticated);
        assert_eq!(persisted.token.as_deref(), Some("login-token"));
    }

    #[tokio::test]
    async fn rejected_login_leaves_state_unchanged() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.fail_login(AuthError::InvalidCredentials("bad password".into()));
        let store = store_with(backend, Arc::new(MemoryStore::new()));
        store.restore().await;
        let before = store.snapshot();

        let err = store
            .login(&Credentials::new("ada@example.org", "wrong"))
            .await
            .expect_err("login should fail");

        assert_eq!(err, AuthError::InvalidCredentials("bad password".into()));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn refresh_rotates_token() {
        let (store, backend, persistence) = authenticated_store().await;
        backend.push_refresh(Ok(RefreshResponse {
            token: "rotated".into(),
            user: None,
        }));

        store.refresh_token().await.expect("refresh should succeed");

        let snapshot = store.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.token.as_deref(), Some("rotated"));
        assert_eq!(snapshot.user, Some(sample_user()));
        assert_eq!(
            persistence.current().and_then(|p| p.token).as_deref(),
            Some("rotated")
        );
    }

    #[tokio::test]
    async fn failed_refresh_clears_session() {
        let (store, backend, persistence) = authenticated_store().await;
        backend.push_refresh(Err(AuthError::ExpiredOrInvalidSession("expired".into())));

        let err = store.refresh_token().await.expect_err("refresh should fail");

        assert!(matches!(err, AuthError::ExpiredOrInvalidSession(_)));
        let snapshot = store.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.token.is_none());
        assert!(snapshot.user.is_none());
        assert!(persistence.current().is_none());
    }

    #[test]
    fn from_config_talks_to_the_http_backend() {
        let store = SessionStore::from_config(&SessionConfig::default()).expect("store should build");
        assert_eq!(store.backend_name(), "http");

        let scripted = store_with(Arc::new(ScriptedBackend::default()), Arc::new(MemoryStore::new()));
        assert_eq!(scripted.backend_name(), "scripted");
    }

    #[tokio::test]
    async fn refresh_without_token_is_rejected_without_side_effects() {
        let backend = Arc::new(ScriptedBackend::default());
        let store = store_with(backend.clone(), Arc::new(MemoryStore::new()));
        store.restore().await;

        let err = store.refresh_token().await.expect_err("nothing to refresh");
        assert_eq!(err, AuthError::NotAuthenticated);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn logout_wins_over_slow_refresh() {
        let (store, backend, persistence) = authenticated_store().await;
        let release = backend.hold_next_refresh();
        backend.push_refresh(Ok(RefreshResponse {
            token: "stale-rotation".into(),
            user: None,
        }));

        let refreshing = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh_token().await })
        };
        wait_for_refresh_calls(&backend, 1).await;

        store.logout().await;
        let _ = release.send(());
        let result = refreshing.await.expect("refresh task should not panic");

        assert_eq!(result, Err(AuthError::Superseded));
        let snapshot = store.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.token.is_none());
        assert!(!snapshot.is_loading);
        assert!(persistence.current().is_none());
    }

    #[tokio::test]
    async fn slow_login_after_logout_is_discarded() {
        let backend = Arc::new(ScriptedBackend::default());
        let store = Arc::new(store_with(backend.clone(), Arc::new(MemoryStore::new())));
        store.restore().await;
        let release = backend.hold_next_login();

        let logging_in = {
            let store = store.clone();
            tokio::spawn(async move { store.login(&Credentials::new("ada@example.org", "pw")).await })
        };
        while backend.login_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(store.snapshot().is_loading);

        store.logout().await;
        let _ = release.send(());
        let result = logging_in.await.expect("login task should not panic");

        assert_eq!(result, Err(AuthError::Superseded));
        assert!(!store.snapshot().is_authenticated);
        assert!(!store.snapshot().is_loading);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_cancel_pending_login() {
        let (store, backend, _) = authenticated_store().await;
        let release = backend.hold_next_login();
        backend.push_refresh(Err(AuthError::ExpiredOrInvalidSession("old session".into())));

        let logging_in = {
            let store = store.clone();
            tokio::spawn(async move { store.login(&Credentials::new("ada@example.org", "pw")).await })
        };
        while backend.login_calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        let refreshed = store.refresh_token().await;
        assert_eq!(refreshed, Err(AuthError::Superseded));
        assert!(store.snapshot().is_authenticated);

        let _ = release.send(());
        let result = logging_in.await.expect("login task should not panic");

        assert_eq!(result.map(|user| user.id), Ok("42".to_string()));
        let snapshot = store.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.token.as_deref(), Some("login-token"));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn concurrent_refreshes_apply_in_call_order() {
        let (store, backend, _) = authenticated_store().await;
        backend.push_refresh(Ok(RefreshResponse {
            token: "first".into(),
            user: None,
        }));
        backend.push_refresh(Ok(RefreshResponse {
            token: "second".into(),
            user: None,
        }));

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh_token().await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh_token().await })
        };
        a.await.expect("task").expect("refresh");
        b.await.expect("task").expect("refresh");

        assert_eq!(store.snapshot().token.as_deref(), Some("second"));
        assert_eq!(
            backend.refreshed_with(),
            vec!["login-token".to_string(), "first".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_refresh_times_out_and_clears_loading() {
        let (store, backend, _) = authenticated_store().await;
        let _never_released = backend.hold_next_refresh();

        let err = store.refresh_token().await.expect_err("refresh should time out");

        assert_eq!(err, AuthError::Timeout);
        let snapshot = store.snapshot();
        assert!(!snapshot.is_loading);
        assert!(!snapshot.is_authenticated);
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_is_unreachable() {
        let (store, backend, persistence) = authenticated_store().await;
        backend.fail_logout(AuthError::Network("connection refused".into()));

        store.logout().await;

        let snapshot = store.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.token.is_none());
        assert!(!snapshot.is_loading);
        assert!(persistence.current().is_none());
        assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forgot_password_does_not_touch_session() {
        let (store, backend, _) = authenticated_store().await;
        let before = store.snapshot();

        store
            .forgot_password("ada@example.org")
            .await
            .expect("forgot password should succeed");

        assert_eq!(store.snapshot(), before);
        assert_eq!(backend.forgot_calls.load(Ordering::SeqCst), 1);
    }
}
