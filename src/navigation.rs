//! The application shell's routing as seen by the session layer.

use std::sync::Mutex;

use tokio::sync::watch;
use tracing::debug;
use url::form_urlencoded;

use crate::models::User;

/// Reads the current route and performs navigations.
pub trait Navigator: Send + Sync {
    /// Current location, possibly including a query string.
    fn current_path(&self) -> String;
    fn navigate(&self, target: &str);
}

/// Keeps the current location in a watch channel so background tasks can follow it.
pub struct WatchNavigator {
    location: watch::Sender<String>,
    history: Mutex<Vec<String>>,
}

impl WatchNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        let (location, _) = watch::channel(initial.into());
        WatchNavigator {
            location,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    /// Every target passed to `navigate`, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl Navigator for WatchNavigator {
    fn current_path(&self) -> String {
        self.location.borrow().clone()
    }

    fn navigate(&self, target: &str) {
        debug!(target, "Navigating");
        if let Ok(mut history) = self.history.lock() {
            history.push(target.to_string());
        }
        self.location.send_replace(target.to_string());
    }
}

/// Path part of a location: drops any query string or fragment.
pub fn route_of(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    &location[..end]
}

/// Compares routes ignoring a trailing slash; `/` stays `/`.
pub fn normalize_route(route: &str) -> &str {
    let trimmed = route.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

pub fn is_one_of(route: &str, routes: &[String]) -> bool {
    let route = normalize_route(route_of(route));
    routes.iter().any(|candidate| normalize_route(candidate) == route)
}

/// `<login>?redirect=<urlencoded path>`.
pub fn login_redirect(login_route: &str, original_path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", original_path)
        .finish();
    format!("{}?{}", login_route, query)
}

/// Reads the `redirect` parameter out of a query string.
pub fn redirect_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "redirect")
        .map(|(_, value)| value.into_owned())
}

/// Only same-origin absolute paths are followed after login.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// Where to go once login succeeds: the requested page when it is a local
/// path, else the user's dashboard, else home.
pub fn post_login_target(redirect: Option<&str>, user: Option<&User>, home_route: &str) -> String {
    if let Some(target) = redirect.filter(|target| is_local_path(target)) {
        return target.to_string();
    }
    user.and_then(|user| user.role.dashboard_route())
        .unwrap_or(home_route)
        .to_string()
}
