use crate::config::Config;
use crate::storage::BlobStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Parameters for a single outbound fax.
#[derive(Debug, Clone, Deserialize)]
pub struct SendFaxParams {
    /// Destination number (E.164, not validated beyond presence).
    pub to: String,
    /// Publicly fetchable URL of the document to transmit.
    pub media_url: String,
}

/// A vendor response body, decoded best-effort.
///
/// Bodies that parse as JSON are kept structured; anything else (HTML error
/// pages, empty bodies, truncated JSON) is kept as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VendorBody {
    Json(Value),
    Text(String),
}

impl VendorBody {
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => VendorBody::Json(value),
            Err(_) => VendorBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            VendorBody::Json(value) => Some(value),
            VendorBody::Text(_) => None,
        }
    }
}

/// Normalized outcome of a vendor send call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSendResult {
    /// Mirrors the vendor's HTTP success.
    pub ok: bool,
    /// Vendor HTTP status, or a local status when no vendor call was made.
    pub status: u16,
    pub fax: Option<VendorBody>,
    pub raw: VendorBody,
}

impl ProviderSendResult {
    /// Maps a vendor HTTP response 1:1.
    pub fn from_vendor(status: u16, body: &[u8]) -> Self {
        let decoded = VendorBody::decode(body);
        Self {
            ok: (200..300).contains(&status),
            status,
            fax: Some(decoded.clone()),
            raw: decoded,
        }
    }

    /// A required configuration field is missing; no vendor call was made.
    pub fn not_configured(field: &str) -> Self {
        Self::local_failure(500, format!("{} not configured", field))
    }

    /// The vendor could not be reached or its body could not be read.
    pub fn transport_failure(error: &reqwest::Error) -> Self {
        Self::local_failure(502, format!("Vendor request failed: {}", error))
    }

    fn local_failure(status: u16, error: String) -> Self {
        Self {
            ok: false,
            status,
            fax: None,
            raw: VendorBody::Json(json!({ "error": error })),
        }
    }

    /// Human-readable error for failed sends.
    pub fn error_message(&self) -> Option<String> {
        if self.ok {
            return None;
        }
        let message = match &self.raw {
            VendorBody::Json(value) => value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Vendor returned status {}", self.status)),
            VendorBody::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
            VendorBody::Text(_) => format!("Vendor returned status {}", self.status),
        };
        Some(message)
    }
}

/// Per-request context handed to every provider call.
///
/// Owned by the router for the lifetime of one HTTP request; providers only
/// borrow it.
pub struct ProviderContext<'a> {
    pub request_id: String,
    /// Origin for callback and media URLs, without a trailing slash.
    pub base_url: String,
    pub env: &'a Config,
    pub blobs: &'a dyn BlobStore,
    pub http: &'a reqwest::Client,
    pub span: tracing::Span,
}

impl<'a> ProviderContext<'a> {
    pub fn new(
        request_id: impl Into<String>,
        base_url: impl Into<String>,
        env: &'a Config,
        blobs: &'a dyn BlobStore,
        http: &'a reqwest::Client,
    ) -> Self {
        let request_id = request_id.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let span = tracing::info_span!("request", request_id = %request_id);
        Self {
            request_id,
            base_url,
            env,
            blobs,
            http,
            span,
        }
    }

    /// Absolute URL for an inbound path on this gateway.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
