use std::time::Duration;

use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{AuthBackend, Credentials, LoginResponse, RefreshResponse};
use crate::config::BackendConfig;
use crate::models::User;
use crate::session::AuthError;

/// Which call a response belongs to; decides how a 401/403 is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Login,
    Refresh,
    Logout,
    ForgotPassword,
}

impl Operation {
    fn path(&self) -> &'static str {
        match self {
            Operation::Login => "auth/login",
            Operation::Refresh => "auth/refresh",
            Operation::Logout => "auth/logout",
            Operation::ForgotPassword => "auth/forgot-password",
        }
    }

    fn rejection(&self, status: StatusCode, message: String) -> AuthError {
        let denied = status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN;
        match self {
            Operation::Login if denied => AuthError::InvalidCredentials(message),
            Operation::Refresh if denied => AuthError::ExpiredOrInvalidSession(message),
            _ => AuthError::Backend {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// The `res` payload of a successful call plus any token the backend set as a cookie.
struct Reply {
    res: Value,
    cookie_token: Option<String>,
}

/// The token may come in `res` or only as the session cookie.
#[derive(Deserialize)]
struct LoginPayload {
    #[serde(default)]
    token: Option<String>,
    user: User,
}

#[derive(Deserialize)]
struct RefreshPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// Talks to the GrantEzy REST API, which wraps every answer in
/// `{ "status": ..., "res": ..., "message": ... }`.
pub struct HttpAuthBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpAuthBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        info!(base_url = config.base_url.as_str(), "Creating HTTP auth backend");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn request(&self, operation: Operation) -> RequestBuilder {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            operation.path()
        );
        self.client.post(url)
    }

    /// Attaches the session token both as the session cookie and as a bearer token.
    fn with_token(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header(COOKIE, format!("{}={}", self.config.cookie_name, token))
            .bearer_auth(token)
    }

    fn token_from_set_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
            .find(|cookie| cookie.name() == self.config.cookie_name && !cookie.value().is_empty())
            .map(|cookie| cookie.value().to_string())
    }

    async fn call(&self, operation: Operation, request: RequestBuilder) -> Result<Reply, AuthError> {
        debug!(operation = ?operation, "Sending auth backend request");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AuthError::Timeout
            } else {
                AuthError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let cookie_token = self.token_from_set_cookie(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(format!("Error reading response body: {}", e)))?;
        let envelope: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        if !status.is_success() {
            debug!(operation = ?operation, status = status.as_u16(), "Auth backend rejected request");
            return Err(operation.rejection(status, message));
        }
        if let Some(envelope_status) = envelope_failure(envelope.get("status")) {
            debug!(operation = ?operation, status = envelope_status.as_u16(), "Auth backend reported failure in envelope");
            return Err(operation.rejection(envelope_status, message));
        }

        Ok(Reply {
            res: envelope.get("res").cloned().unwrap_or(Value::Null),
            cookie_token,
        })
    }
}

/// Reads the envelope `status` field. Returns the failing status, if any.
fn envelope_failure(status: Option<&Value>) -> Option<StatusCode> {
    match status? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .filter(|code| code.is_client_error() || code.is_server_error()),
        Value::Bool(false) => Some(StatusCode::BAD_REQUEST),
        Value::String(s) if matches!(s.to_lowercase().as_str(), "error" | "fail" | "failed") => {
            Some(StatusCode::BAD_REQUEST)
        }
        _ => None,
    }
}

/// Prefers the body token over the one set as a cookie.
fn session_token(
    operation: Operation,
    body_token: Option<String>,
    cookie_token: Option<String>,
) -> Result<String, AuthError> {
    body_token
        .filter(|token| !token.is_empty())
        .or(cookie_token)
        .ok_or_else(|| {
            warn!(operation = ?operation, "Auth backend accepted the call but returned no token");
            AuthError::Backend {
                status: StatusCode::OK.as_u16(),
                message: format!("{:?} response carried no token", operation),
            }
        })
}

fn parse_res<T: DeserializeOwned>(operation: Operation, res: Value) -> Result<T, AuthError> {
    serde_json::from_value(res).map_err(|e| AuthError::Backend {
        status: StatusCode::OK.as_u16(),
        message: format!("Malformed {:?} response: {}", operation, e),
    })
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    fn get_name(&self) -> &str {
        "http"
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        let request = self.request(Operation::Login).json(credentials);
        let reply = self.call(Operation::Login, request).await?;
        let payload: LoginPayload = parse_res(Operation::Login, reply.res)?;
        let token = session_token(Operation::Login, payload.token, reply.cookie_token)?;
        Ok(LoginResponse {
            token,
            user: payload.user,
        })
    }

    async fn refresh(&self, token: &str) -> Result<RefreshResponse, AuthError> {
        let request = self.with_token(self.request(Operation::Refresh), token);
        let reply = self.call(Operation::Refresh, request).await?;
        let payload: RefreshPayload = if reply.res.is_null() {
            RefreshPayload {
                token: None,
                user: None,
            }
        } else {
            parse_res(Operation::Refresh, reply.res)?
        };

        let token = session_token(Operation::Refresh, payload.token, reply.cookie_token)?;
        Ok(RefreshResponse {
            token,
            user: payload.user,
        })
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        let mut request = self.request(Operation::Logout);
        if let Some(token) = token {
            request = self.with_token(request, token);
        }
        self.call(Operation::Logout, request).await.map(|_| ())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let request = self
            .request(Operation::ForgotPassword)
            .json(&json!({ "email": email }));
        self.call(Operation::ForgotPassword, request).await.map(|_| ())
    }
}
