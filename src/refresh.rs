//! Background token refresh.
//!
//! At most one timer is armed, and only while the session is authenticated and
//! the user is not on an auth-entry route. The first refresh happens one full
//! period after arming.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::models::SessionSnapshot;
use crate::navigation::is_one_of;
use crate::session::SessionStore;

/// Owns an armed timer task; dropping the handle stops the timer.
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct RefreshLoop {
    store: Arc<SessionStore>,
    period: Duration,
    auth_entry_routes: Vec<String>,
    timer: Mutex<Option<TimerHandle>>,
    ticks: Arc<AtomicU64>,
}

impl RefreshLoop {
    pub fn new(store: Arc<SessionStore>, period: Duration, auth_entry_routes: Vec<String>) -> Self {
        RefreshLoop {
            store,
            period,
            auth_entry_routes,
            timer: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<TimerHandle>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.timer().is_some()
    }

    /// Number of timer ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn should_run(&self, authenticated: bool, route: &str) -> bool {
        authenticated && !is_one_of(route, &self.auth_entry_routes)
    }

    /// Arms or disarms to match the activation condition. An already armed
    /// timer is kept as is. Returns whether a timer is armed afterwards.
    pub fn sync(&self, authenticated: bool, route: &str) -> bool {
        let mut timer = self.timer();
        if self.should_run(authenticated, route) {
            if timer.is_none() {
                debug!(route, "Arming refresh timer");
                *timer = Some(self.spawn_timer());
            }
            true
        } else {
            if timer.take().is_some() {
                debug!(route, authenticated, "Disarming refresh timer");
            }
            false
        }
    }

    /// Starts a fresh timer, replacing any armed one.
    pub fn arm(&self) {
        let mut timer = self.timer();
        timer.take();
        *timer = Some(self.spawn_timer());
    }

    pub fn disarm(&self) {
        self.timer().take();
    }

    fn spawn_timer(&self) -> TimerHandle {
        let store = self.store.clone();
        let ticks = self.ticks.clone();
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticks.fetch_add(1, Ordering::SeqCst);
                // Detached so disarming mid-call cannot cut the store's commit short.
                let store = store.clone();
                match tokio::spawn(async move { store.refresh_token().await }).await {
                    Ok(Ok(())) => debug!("Scheduled token refresh succeeded"),
                    Ok(Err(e)) => debug!(error = %e, "Scheduled token refresh failed"),
                    Err(e) => debug!(error = %e, "Scheduled token refresh task aborted"),
                }
            }
        });
        TimerHandle { task }
    }

    /// Follows session and route changes until either channel closes, keeping
    /// the timer in step. The timer is disarmed on the way out.
    pub async fn run(
        &self,
        mut session: watch::Receiver<SessionSnapshot>,
        mut route: watch::Receiver<String>,
    ) {
        info!(period_secs = self.period.as_secs(), "Refresh supervisor started");
        loop {
            let authenticated = session.borrow_and_update().is_authenticated;
            let current = route.borrow_and_update().clone();
            self.sync(authenticated, &current);

            let closed = tokio::select! {
                changed = session.changed() => changed.is_err(),
                changed = route.changed() => changed.is_err(),
            };
            if closed {
                break;
            }
        }
        self.disarm();
        info!("Refresh supervisor stopped");
    }
}
