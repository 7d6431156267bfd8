use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde_json::Value;
use tracing::debug;

use crate::config::GateConfig;

/// Whether the session cookie counts as present at the edge.
///
/// Empty values never count. With `reject_expired_cookies` a JWT whose `exp`
/// has passed is also ignored; anything that is not a readable JWT still counts.
pub fn session_cookie_present(value: Option<&str>, config: &GateConfig) -> bool {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return false;
    };
    if config.reject_expired_cookies && token_expired(value) {
        debug!("Ignoring session cookie with an expired token");
        return false;
    }
    true
}

/// Reads `exp` without checking the signature. Only a definite expiry returns true.
pub fn token_expired(token: &str) -> bool {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<Value>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(_) => false,
        Err(e) => matches!(e.kind(), ErrorKind::ExpiredSignature),
    }
}
