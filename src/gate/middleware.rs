use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use super::GateDecision;
use super::cookie::session_cookie_present;
use crate::state::AppState;

/// Runs the edge gate in front of every page request.
/// Install with `axum::middleware::from_fn_with_state`.
pub async fn edge_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let cookie = jar.get(&state.config.gate.cookie_name).map(|c| c.value());
    let has_session = session_cookie_present(cookie, &state.config.gate);

    let decision = state.gate.decide(request.uri().path(), has_session);
    match decision {
        GateDecision::PassThrough => next.run(request).await,
        GateDecision::Redirect(location) => {
            debug!(
                path = request.uri().path(),
                location = location.as_str(),
                has_session,
                "Edge gate redirect"
            );
            Redirect::temporary(&location).into_response()
        }
    }
}
