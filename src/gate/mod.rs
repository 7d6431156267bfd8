//! Edge request gate.
//!
//! A pure decision over (path, session-cookie presence) made before any page
//! is served. Cookie presence is all that is checked here; token validity is
//! left to the backend on actual API calls.

pub mod cookie;
pub mod middleware;

use crate::config::{GateConfig, RouteConfig};
use crate::navigation::{is_one_of, login_redirect, normalize_route};

pub use middleware::edge_gate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct EdgeGate {
    bypass_prefixes: Vec<String>,
    bypass_dotted_paths: bool,
    public_routes: Vec<String>,
    auth_entry_routes: Vec<String>,
    login_route: String,
    home_route: String,
}

impl EdgeGate {
    pub fn new(gate: &GateConfig, routes: &RouteConfig) -> Self {
        EdgeGate {
            bypass_prefixes: gate
                .bypass_prefixes
                .iter()
                .map(|prefix| normalize_route(prefix).to_string())
                .collect(),
            bypass_dotted_paths: gate.bypass_dotted_paths,
            public_routes: routes.public_routes.clone(),
            auth_entry_routes: routes.auth_entry_routes.clone(),
            login_route: routes.login_route.clone(),
            home_route: routes.home_route.clone(),
        }
    }

    /// Framework assets, API proxies, static files and anything that looks like a file.
    pub fn is_bypassed(&self, path: &str) -> bool {
        let prefixed = self.bypass_prefixes.iter().any(|prefix| {
            prefix == "/"
                || path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        prefixed || (self.bypass_dotted_paths && has_dotted_segment(path))
    }

    pub fn decide(&self, path: &str, has_session_cookie: bool) -> GateDecision {
        if self.is_bypassed(path) {
            return GateDecision::PassThrough;
        }
        if has_session_cookie && is_one_of(path, &self.auth_entry_routes) {
            return GateDecision::Redirect(self.home_route.clone());
        }
        let is_root = normalize_route(path) == "/";
        if !has_session_cookie && !is_root && !is_one_of(path, &self.public_routes) {
            return GateDecision::Redirect(login_redirect(&self.login_route, path));
        }
        GateDecision::PassThrough
    }
}

fn has_dotted_segment(path: &str) -> bool {
    path.split('/')
        .any(|segment| segment.contains('.') && segment != "." && segment != "..")
}
