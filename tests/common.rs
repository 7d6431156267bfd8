use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response, header};
use grantezy_session::config::{ConfigV1, parse_config};
use grantezy_session::routes::create_router;
use grantezy_session::state::AppState;

pub fn load_test_config(yaml: &str) -> ConfigV1 {
    parse_config(yaml).expect("Failed to parse test config YAML")
}

pub fn build_app(config: ConfigV1) -> Router {
    create_router(AppState::new(Arc::new(config)))
}

/// A page shell with an index page and one static asset.
pub fn write_shell(dir: &Path) {
    std::fs::write(dir.join("index.html"), "<html>grantezy shell</html>").expect("index");
    std::fs::create_dir_all(dir.join("assets")).expect("assets dir");
    std::fs::write(dir.join("assets").join("logo.png"), b"\x89PNG").expect("logo");
}

pub fn get(path: &str, session_cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(token) = session_cookie {
        builder = builder.header(header::COOKIE, format!("theme=dark; jwtToken={}", token));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8_lossy(&bytes).into_owned()
}
