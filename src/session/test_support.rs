//! Scripted auth backend and store builders shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{AuthError, SessionStore};
use crate::backend::{AuthBackend, Credentials, LoginResponse, RefreshResponse};
use crate::models::{Role, User};
use crate::store::{MemoryStore, SessionPersistence};

pub fn sample_user() -> User {
    User::new("42", "Ada", "Lovelace", "ada@example.org", Role::Admin)
}

/// Answers from a script. Without a scripted answer login returns
/// `login-token` and refresh returns `refreshed-<n>`.
#[derive(Default)]
pub struct ScriptedBackend {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub forgot_calls: AtomicUsize,
    login_error: Mutex<Option<AuthError>>,
    logout_error: Mutex<Option<AuthError>>,
    refresh_results: Mutex<VecDeque<Result<RefreshResponse, AuthError>>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    login_hold: Mutex<Option<oneshot::Receiver<()>>>,
    refresh_hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedBackend {
    pub fn fail_login(&self, error: AuthError) {
        *self.login_error.lock().unwrap() = Some(error);
    }

    pub fn fail_logout(&self, error: AuthError) {
        *self.logout_error.lock().unwrap() = Some(error);
    }

    pub fn push_refresh(&self, result: Result<RefreshResponse, AuthError>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    /// The next login blocks until the returned sender fires (or is dropped).
    pub fn hold_next_login(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.login_hold.lock().unwrap() = Some(rx);
        tx
    }

    /// The next refresh blocks until the returned sender fires (or is dropped).
    pub fn hold_next_refresh(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.refresh_hold.lock().unwrap() = Some(rx);
        tx
    }

    /// Tokens presented to `refresh`, in call order.
    pub fn refreshed_with(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }
}

async fn wait_if_held(hold: &Mutex<Option<oneshot::Receiver<()>>>) {
    let held = hold.lock().unwrap().take();
    if let Some(rx) = held {
        let _ = rx.await;
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    fn get_name(&self) -> &str {
        "scripted"
    }

    async fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        wait_if_held(&self.login_hold).await;
        if let Some(error) = self.login_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(LoginResponse {
            token: "login-token".to_string(),
            user: sample_user(),
        })
    }

    async fn refresh(&self, token: &str) -> Result<RefreshResponse, AuthError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_tokens_seen.lock().unwrap().push(token.to_string());
        wait_if_held(&self.refresh_hold).await;
        let scripted = self.refresh_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(RefreshResponse {
                token: format!("refreshed-{}", n),
                user: None,
            })
        })
    }

    async fn logout(&self, _token: Option<&str>) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        match self.logout_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn forgot_password(&self, _email: &str) -> Result<(), AuthError> {
        self.forgot_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn store_with(
    backend: Arc<ScriptedBackend>,
    persistence: Arc<dyn SessionPersistence>,
) -> SessionStore {
    SessionStore::new(backend, persistence, Duration::from_secs(30))
}

/// A hydrated store that has completed one login.
pub async fn authenticated_store() -> (Arc<SessionStore>, Arc<ScriptedBackend>, Arc<MemoryStore>) {
    let backend = Arc::new(ScriptedBackend::default());
    let persistence = Arc::new(MemoryStore::new());
    let store = Arc::new(store_with(backend.clone(), persistence.clone()));
    store.restore().await;
    store
        .login(&Credentials::new("ada@example.org", "pw"))
        .await
        .expect("scripted login should succeed");
    (store, backend, persistence)
}
