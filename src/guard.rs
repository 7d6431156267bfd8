//! Hydration-aware guard for protected views.
//!
//! The guard reads the session store and decides what a protected view renders.
//! It never navigates before hydration has finished, so a session that is still
//! being restored is not mistaken for a missing one.

use std::sync::Arc;

use tracing::debug;

use crate::models::SessionSnapshot;
use crate::navigation::{Navigator, is_one_of, login_redirect, route_of};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Not hydrated yet, or a session call is in flight.
    Pending,
    Unauthenticated,
    Authenticated,
}

impl GuardState {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        if !snapshot.is_hydrated || snapshot.is_loading {
            GuardState::Pending
        } else if snapshot.has_session() {
            GuardState::Authenticated
        } else {
            GuardState::Unauthenticated
        }
    }
}

/// What the protected view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    /// Spinner while pending or while the login redirect completes.
    Placeholder,
    Children,
}

pub struct HydrationGuard {
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl HydrationGuard {
    pub fn new(
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        login_route: impl Into<String>,
    ) -> Self {
        HydrationGuard {
            store,
            navigator,
            login_route: login_route.into(),
        }
    }

    pub fn state(&self) -> GuardState {
        GuardState::from_snapshot(&self.store.snapshot())
    }

    /// Decides the view for the current session state, sending an
    /// unauthenticated visitor to login with the current path attached.
    pub fn evaluate(&self) -> GuardView {
        self.apply(self.state())
    }

    fn apply(&self, state: GuardState) -> GuardView {
        match state {
            GuardState::Pending => GuardView::Placeholder,
            GuardState::Authenticated => GuardView::Children,
            GuardState::Unauthenticated => {
                let current = self.navigator.current_path();
                if is_one_of(&current, std::slice::from_ref(&self.login_route)) {
                    return GuardView::Placeholder;
                }
                // Path only, like the edge gate.
                let target = login_redirect(&self.login_route, route_of(&current));
                debug!(from = current.as_str(), to = target.as_str(), "Guard redirecting to login");
                self.navigator.navigate(&target);
                GuardView::Placeholder
            }
        }
    }

    /// Waits until the session leaves the pending state, then evaluates.
    pub async fn resolve(&self) -> GuardView {
        let mut snapshots = self.store.subscribe();
        // A closed channel means the store is gone and will never hydrate.
        let state = snapshots
            .wait_for(|snapshot| GuardState::from_snapshot(snapshot) != GuardState::Pending)
            .await
            .map(|snapshot| GuardState::from_snapshot(&snapshot))
            .unwrap_or(GuardState::Pending);
        self.apply(state)
    }
}
