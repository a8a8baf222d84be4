//! Fax vendor abstraction.
//!
//! Every supported vendor is a variant of [`Provider`]. Dispatch is a plain
//! `match`, so adding a vendor means adding a variant and its arms; the
//! compiler points at every place that needs one.

pub mod auth;
pub mod documo;
pub mod humblefax;
pub mod telnyx;
pub mod types;

pub use types::{ProviderContext, ProviderSendResult, SendFaxParams, VendorBody};

use crate::config::Config;
use crate::webhook::{self, WebhookBody, WebhookEvent};
use axum::body::Bytes;
use axum::extract::Request;
use axum::response::Response;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Instrument;

/// Provider used when no name is configured.
pub const DEFAULT_PROVIDER: Provider = Provider::Telnyx;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Unknown fax provider: {0}")]
    Unknown(String),
}

/// A supported fax vendor.
///
/// Providers hold no state; every call receives what it needs through
/// [`ProviderContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Bearer-token API.
    Telnyx,
    /// Basic auth with the API key as user and an empty password.
    Documo,
    /// Basic auth with an access/secret key pair.
    HumbleFax,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Telnyx, Provider::Documo, Provider::HumbleFax];

    /// Stable lowercase identifier, also used as the storage key prefix.
    pub fn name(self) -> &'static str {
        match self {
            Provider::Telnyx => "telnyx",
            Provider::Documo => "documo",
            Provider::HumbleFax => "humblefax",
        }
    }

    /// The inbound path this vendor posts webhooks to.
    pub fn webhook_path(self) -> &'static str {
        match self {
            Provider::Telnyx => "/webhooks/telnyx",
            Provider::Documo => "/webhooks/documo",
            Provider::HumbleFax => "/webhooks/humblefax",
        }
    }

    /// Sends a fax through this vendor.
    ///
    /// Never fails: missing configuration, vendor rejections and transport
    /// errors all come back as a [`ProviderSendResult`].
    pub async fn send_fax(
        self,
        params: &SendFaxParams,
        ctx: &ProviderContext<'_>,
    ) -> ProviderSendResult {
        let span = tracing::info_span!(parent: &ctx.span, "send_fax", provider = self.name());
        let result = async {
            let outcome = match self {
                Provider::Telnyx => telnyx::send_fax(params, ctx).await,
                Provider::Documo => documo::send_fax(params, ctx).await,
                Provider::HumbleFax => humblefax::send_fax(params, ctx).await,
            };
            // Err carries a local failure (missing config) in the same shape
            outcome.unwrap_or_else(|failure| failure)
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| {
            if result.ok {
                tracing::info!(status = result.status, "Fax accepted by vendor");
            } else {
                tracing::warn!(
                    status = result.status,
                    error = %result.error_message().unwrap_or_default(),
                    "Fax send failed"
                );
            }
        });

        result
    }

    /// Normalizes an inbound vendor webhook into the blob store.
    ///
    /// Always answers 200 once the body has been read and stored; 500 only
    /// when the body cannot be read or storage fails.
    pub async fn handle_webhook(self, request: Request, ctx: &ProviderContext<'_>) -> Response {
        let span = tracing::info_span!(parent: &ctx.span, "webhook", provider = self.name());
        webhook::handle(self, request, ctx).instrument(span).await
    }

    /// Extracts the vendor-specific fax id, event type and media reference.
    pub(crate) fn inspect_webhook(self, body: &WebhookBody) -> WebhookEvent {
        match self {
            Provider::Telnyx => telnyx::inspect_webhook(body),
            Provider::Documo => documo::inspect_webhook(body),
            Provider::HumbleFax => humblefax::inspect_webhook(body),
        }
    }

    /// The vendor's `authorization` header value, reused for media fetches.
    /// `None` when the credentials are not configured.
    pub fn authorization(self, env: &Config) -> Option<String> {
        match self {
            Provider::Telnyx => telnyx::authorization(env).ok(),
            Provider::Documo => documo::authorization(env).ok(),
            Provider::HumbleFax => humblefax::authorization(env).ok(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Provider::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ProviderError::Unknown(wanted.to_string()))
    }
}

/// Resolves a configured provider name.
///
/// Matching is case-insensitive; an absent or blank name selects
/// [`DEFAULT_PROVIDER`]. Unknown names are an error, never a fallback.
pub fn resolve_provider(name: Option<&str>) -> Result<Provider, ProviderError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(DEFAULT_PROVIDER),
        Some(name) => name.parse(),
    }
}

/// Returns the configured value or a "not configured" result.
fn required<'c>(value: &'c Option<String>, field: &str) -> Result<&'c str, ProviderSendResult> {
    value
        .as_deref()
        .ok_or_else(|| ProviderSendResult::not_configured(field))
}

/// Posts a JSON body to a vendor and maps the HTTP outcome.
async fn post_json(
    ctx: &ProviderContext<'_>,
    url: &str,
    authorization: &str,
    body: &Value,
) -> ProviderSendResult {
    tracing::debug!(url, "Calling vendor API");

    let response = match ctx
        .http
        .post(url)
        .header(AUTHORIZATION, authorization)
        .json(body)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => return ProviderSendResult::transport_failure(&e),
    };

    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(bytes) => ProviderSendResult::from_vendor(status, &bytes),
        Err(e) => ProviderSendResult::transport_failure(&e),
    }
}

/// Media downloaded from a vendor.
#[derive(Debug, Clone)]
pub(crate) struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Downloads vendor-hosted media. Failures are logged and yield `None`.
pub(crate) async fn fetch_media(
    ctx: &ProviderContext<'_>,
    url: &str,
    authorization: &str,
) -> Option<FetchedMedia> {
    let response = match ctx
        .http
        .get(url)
        .header(AUTHORIZATION, authorization)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(url, error = %e, "Media fetch failed");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!(url, status = response.status().as_u16(), "Media fetch rejected");
        return None;
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/pdf")
        .to_string();

    match response.bytes().await {
        Ok(bytes) => {
            tracing::debug!(url, size = bytes.len(), "Fetched media");
            Some(FetchedMedia {
                bytes,
                content_type,
            })
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "Media download interrupted");
            None
        }
    }
}
