//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::response::Response;
use fax_gateway::Config;
use serde_json::Value;

pub const BOUNDARY: &str = "fax-gateway-test-boundary";

/// Config with every vendor fully credentialed and pointed at `api_base`.
pub fn full_config(api_base: &str) -> Config {
    Config {
        public_base_url: Some("https://gateway.test".to_string()),
        fax_from: Some("+15550000000".to_string()),
        telnyx_api_key: Some("KEY0123".to_string()),
        telnyx_connection_id: Some("conn-1".to_string()),
        telnyx_api_base: api_base.to_string(),
        documo_api_key: Some("key_123".to_string()),
        documo_api_base: api_base.to_string(),
        humblefax_access_key: Some("access".to_string()),
        humblefax_secret_key: Some("secret".to_string()),
        humblefax_api_base: api_base.to_string(),
        ..Config::default()
    }
}

/// Config with no vendor credentials at all.
pub fn bare_config(api_base: &str) -> Config {
    Config {
        public_base_url: Some("https://gateway.test".to_string()),
        telnyx_api_base: api_base.to_string(),
        documo_api_base: api_base.to_string(),
        humblefax_api_base: api_base.to_string(),
        ..Config::default()
    }
}

/// Builds a multipart body with text fields and a single file part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &str, &[u8])>) -> Vec<u8> {
    let files: Vec<_> = file.into_iter().collect();
    multipart_files(fields, &files)
}

/// Builds a multipart body with text fields and any number of file parts,
/// each given as `(field, file_name, content_type, bytes)`.
pub fn multipart_files(fields: &[(&str, &str)], files: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (field, file_name, content_type, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn post(path: &str, content_type: &str, body: impl Into<Body>) -> Request {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
