//! Basic auth for client-facing routes.

use super::{request_id, AppState};
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;

/// Decodes `Authorization: Basic ...` into `(user, password)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Axum middleware enforcing `BASIC_AUTH_USER` / `BASIC_AUTH_PASS`.
/// Passes everything through when neither is configured.
pub async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let config = &state.config;
    if !config.auth_enabled() {
        return next.run(request).await;
    }

    let expected_user = config.basic_auth_user.as_deref().unwrap_or_default();
    let expected_pass = config.basic_auth_pass.as_deref().unwrap_or_default();

    let authorized = basic_credentials(request.headers())
        .map(|(user, pass)| {
            // evaluate both to keep timing independent of which part differs
            let user_ok = constant_time_eq(user.as_bytes(), expected_user.as_bytes());
            let pass_ok = constant_time_eq(pass.as_bytes(), expected_pass.as_bytes());
            user_ok & pass_ok
        })
        .unwrap_or(false);

    if authorized {
        return next.run(request).await;
    }

    let id = request_id(request.headers());
    tracing::warn!(request_id = %id, path = %request.uri().path(), "Rejected unauthenticated request");
    let mut response = AppError::Unauthorized.for_request(&id).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"fax-gateway\""),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(
            basic_credentials(&headers),
            Some(("user".to_string(), "pass".to_string()))
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("basic dXNlcjpwYXNz"));
        assert!(basic_credentials(&headers).is_some());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer dXNlcjpwYXNz"));
        assert!(basic_credentials(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(basic_credentials(&headers).is_none());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secrets"));
    }
}
