//! Authorization header schemes used by the supported vendors.

use base64::Engine;

/// `Bearer <token>`.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// `Basic base64("<user>:<password>")`. An empty password still keeps the
/// colon.
pub fn basic(user: &str, password: &str) -> String {
    let credentials = format!("{}:{}", user, password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}
