use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Route names shared by the edge gate and the client-side session.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RouteConfig {
    #[serde(default = "default_login_route")]
    pub login_route: String,
    #[serde(default = "default_home_route")]
    pub home_route: String,
    /// Routes reachable without a session cookie.
    #[serde(default = "default_public_routes")]
    pub public_routes: Vec<String>,
    /// Routes that establish a new session (login/signup).
    #[serde(default = "default_auth_entry_routes")]
    pub auth_entry_routes: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        RouteConfig {
            login_route: default_login_route(),
            home_route: default_home_route(),
            public_routes: default_public_routes(),
            auth_entry_routes: default_auth_entry_routes(),
        }
    }
}

/// Edge gate settings: what bypasses the gate and which cookie carries the session.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct GateConfig {
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,
    /// Let any path with a dotted segment (`/logo.png`) through untouched.
    #[serde(default = "default_true")]
    pub bypass_dotted_paths: bool,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Treat cookies holding an already expired JWT as absent.
    /// Signatures are never verified at the edge.
    #[serde(default)]
    pub reject_expired_cookies: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            bypass_prefixes: default_bypass_prefixes(),
            bypass_dotted_paths: true,
            cookie_name: default_cookie_name(),
            reject_expired_cookies: false,
        }
    }
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_home_route() -> String {
    "/".to_string()
}

fn default_public_routes() -> Vec<String> {
    vec!["/login".into(), "/signup".into(), "/".into()]
}

fn default_auth_entry_routes() -> Vec<String> {
    vec!["/login".into(), "/signup".into()]
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/_next".into(), "/api".into(), "/assets".into()]
}

fn default_cookie_name() -> String {
    "jwtToken".to_string()
}

fn default_true() -> bool {
    true
}
