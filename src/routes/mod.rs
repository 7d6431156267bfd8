//! HTTP route definitions.
//!
//! Page-shell routes sit behind the edge gate; the health check does not.

mod health_routes;
mod shell_routes;

use crate::gate::edge_gate;
use crate::state::AppState;
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

/// Creates the application router with all configured routes.
///
/// The gate is layered onto the shell router only, so `/health` stays
/// reachable for probes that carry no session cookie.
pub fn create_router(state: AppState) -> Router {
    let gated = shell_routes::routes(&state.config.shell)
        .layer(middleware::from_fn_with_state(state.clone(), edge_gate));

    Router::new()
        .merge(gated)
        .merge(health_routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
