//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! the configuration and the compiled edge gate.

use crate::config::ConfigV1;
use crate::gate::EdgeGate;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; both fields are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Edge gate built from the route and gate sections of the config.
    pub gate: Arc<EdgeGate>,
}

impl AppState {
    pub fn new(config: Arc<ConfigV1>) -> Self {
        let gate = Arc::new(EdgeGate::new(&config.gate, &config.routes));
        AppState { config, gate }
    }
}
