//! Owned container for the client-side session lifecycle.
//!
//! Holds the session store, the navigator and the refresh loop, and ties the
//! refresh supervisor to its own lifetime: `start` restores persisted state and
//! spawns the supervisor, `shutdown` (or drop) stops it and disarms the timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{RouteConfig, SessionConfig};
use crate::guard::HydrationGuard;
use crate::navigation::{Navigator, WatchNavigator, post_login_target, redirect_param, route_of};
use crate::refresh::RefreshLoop;
use crate::session::{AuthError, SessionStore};

pub struct SessionContext {
    store: Arc<SessionStore>,
    navigator: Arc<WatchNavigator>,
    refresh: Arc<RefreshLoop>,
    routes: RouteConfig,
    supervisor: Option<JoinHandle<()>>,
}

impl SessionContext {
    pub fn new(
        store: Arc<SessionStore>,
        navigator: Arc<WatchNavigator>,
        refresh_period: Duration,
        routes: RouteConfig,
    ) -> Self {
        let refresh = Arc::new(RefreshLoop::new(
            store.clone(),
            refresh_period,
            routes.auth_entry_routes.clone(),
        ));
        SessionContext {
            store,
            navigator,
            refresh,
            routes,
            supervisor: None,
        }
    }

    /// Builds the HTTP-backed store and storage from configuration.
    pub fn from_config(
        config: &SessionConfig,
        routes: &RouteConfig,
        initial_path: &str,
    ) -> Result<Self, AuthError> {
        let store = Arc::new(SessionStore::from_config(config)?);
        Ok(Self::new(
            store,
            Arc::new(WatchNavigator::new(initial_path)),
            Duration::from_secs(config.refresh.interval_in_secs),
            routes.clone(),
        ))
    }

    /// Restores persisted state and starts following session and route changes.
    /// Calling it again is a no-op.
    pub async fn start(&mut self) {
        if self.supervisor.is_some() {
            return;
        }
        self.store.restore().await;

        let refresh = self.refresh.clone();
        let session = self.store.subscribe();
        let route = self.navigator.subscribe();
        self.supervisor = Some(tokio::spawn(async move { refresh.run(session, route).await }));
        info!("Session context started");
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<WatchNavigator> {
        &self.navigator
    }

    pub fn refresh_loop(&self) -> &Arc<RefreshLoop> {
        &self.refresh
    }

    /// A guard for a protected view rendered inside this context.
    pub fn guard(&self) -> HydrationGuard {
        HydrationGuard::new(
            self.store.clone(),
            self.navigator.clone(),
            self.routes.login_route.clone(),
        )
    }

    /// Where the shell should go after a successful login on the current
    /// login page, honouring its `redirect` parameter.
    pub fn post_login_destination(&self) -> String {
        let current = self.navigator.current_path();
        let query = current
            .strip_prefix(route_of(&current))
            .unwrap_or_default()
            .split('#')
            .next()
            .unwrap_or_default();
        let redirect = redirect_param(query);
        let user = self.store.snapshot().user;
        post_login_target(redirect.as_deref(), user.as_ref(), &self.routes.home_route)
    }

    /// Stops the supervisor and disarms the refresh timer.
    pub fn shutdown(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
            info!("Session context stopped");
        }
        self.refresh.disarm();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
