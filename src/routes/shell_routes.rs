//! Serves the built page shell.

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::config::ShellConfig;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Static files from the shell directory; unknown paths get the index page so
/// client-side routing can take over.
pub fn routes(config: &ShellConfig) -> Router<AppState> {
    match &config.dir {
        Some(dir) => {
            info!(dir = dir.as_str(), "Serving page shell");
            let index = Path::new(dir).join(&config.index);
            Router::new().fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => {
            warn!("No shell directory configured; page requests will get 404");
            Router::new().fallback(shell_missing)
        }
    }
}

async fn shell_missing() -> HTTPError {
    HTTPError::new(StatusCode::NOT_FOUND, "No page shell configured")
}
