//! Inbound webhook body decoding.
//!
//! Vendors post JSON, multipart forms, url-encoded forms, or something else
//! entirely. Decoding never rejects a body: anything that does not parse as
//! its declared type is kept as text.

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;

/// Upper bound on a buffered webhook body.
pub const MAX_WEBHOOK_BODY: usize = 32 * 1024 * 1024;

/// A binary part of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

/// A decoded webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookBody {
    Json(Value),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
    Form(Vec<(String, String)>),
    /// Fallback for unrecognized or malformed bodies.
    Text {
        content_type: Option<String>,
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Multipart,
    Form,
    Text,
}

fn classify(content_type: Option<&str>) -> BodyKind {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        "application/json" => BodyKind::Json,
        "multipart/form-data" => BodyKind::Multipart,
        "application/x-www-form-urlencoded" => BodyKind::Form,
        ct if ct.ends_with("+json") => BodyKind::Json,
        _ => BodyKind::Text,
    }
}

/// Reads and decodes a webhook request body.
///
/// Only fails when the body itself cannot be read (client disconnect, size
/// limit).
pub async fn read_body(request: Request) -> Result<WebhookBody, axum::Error> {
    let (parts, body) = request.into_parts();
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = to_bytes(body, MAX_WEBHOOK_BODY).await?;

    let decoded = match classify(content_type.as_deref()) {
        BodyKind::Json => serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| tracing::debug!(error = %e, "Webhook JSON did not parse"))
            .ok()
            .map(WebhookBody::Json),
        BodyKind::Multipart => {
            parse_multipart(Request::from_parts(parts, Body::from(bytes.clone()))).await
        }
        BodyKind::Form => Some(WebhookBody::Form(
            url::form_urlencoded::parse(&bytes).into_owned().collect(),
        )),
        BodyKind::Text => None,
    };

    Ok(decoded.unwrap_or_else(|| WebhookBody::Text {
        content_type,
        text: String::from_utf8_lossy(&bytes).into_owned(),
    }))
}

async fn parse_multipart(request: Request) -> Option<WebhookBody> {
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "Multipart body rejected");
            return None;
        }
    };

    let mut fields = Vec::new();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed multipart body");
                return None;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(field = %name, error = %e, "Failed to read multipart field");
                return None;
            }
        };

        if is_file_part(file_name.as_deref(), content_type.as_deref()) {
            let content_type = content_type.unwrap_or_else(|| {
                mime_guess::from_path(file_name.as_deref().unwrap_or_default())
                    .first_or_octet_stream()
                    .to_string()
            });
            files.push(FilePart {
                field: name,
                file_name,
                content_type,
                bytes,
            });
        } else {
            fields.push((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }

    Some(WebhookBody::Multipart { fields, files })
}

fn is_file_part(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    if file_name.is_some() {
        return true;
    }
    match content_type {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            !(ct.starts_with("text/") || ct.starts_with("application/json"))
        }
        None => false,
    }
}

/// Renders a JSON scalar as a non-empty string.
pub fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl WebhookBody {
    /// Looks up a top-level field: a JSON object key or a form/multipart
    /// text field. Repeated form fields resolve to the last occurrence.
    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            WebhookBody::Json(value) => value.get(name).and_then(scalar_string),
            WebhookBody::Multipart { fields, .. } | WebhookBody::Form(fields) => fields
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            WebhookBody::Text { .. } => None,
        }
    }

    /// Looks up a JSON pointer (`/data/payload/fax_id`) in a JSON body.
    pub fn json_at(&self, pointer: &str) -> Option<String> {
        match self {
            WebhookBody::Json(value) => value.pointer(pointer).and_then(scalar_string),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WebhookBody::Json(_) => "json",
            WebhookBody::Multipart { .. } => "multipart",
            WebhookBody::Form(_) => "form",
            WebhookBody::Text { .. } => "text",
        }
    }
}
