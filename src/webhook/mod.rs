//! Vendor webhook normalization.
//!
//! The flow is the same for every vendor: decode the body, let the vendor
//! pick out its fax id and media reference, store file parts and media
//! (best-effort), then store the payload record. Only a failed payload
//! write turns the delivery into a 500. Vendor differences live in
//! [`Provider::inspect_webhook`].

pub mod body;
pub mod store;

pub use body::{read_body, scalar_string, FilePart, WebhookBody};
pub use store::{fax_key, fax_media_key, Recorder};

use crate::provider::{fetch_media, Provider, ProviderContext};
use crate::storage::BlobError;
use axum::body::Bytes;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Media referenced by a webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaRef {
    /// Hosted by the vendor; fetched with the vendor's credentials.
    Url { url: String, extension: String },
    /// Embedded in the payload.
    Inline { bytes: Bytes, extension: String },
}

/// What a vendor recognized in a webhook body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookEvent {
    pub fax_id: Option<String>,
    pub event_type: Option<String>,
    pub media: Option<MediaRef>,
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Failed to read webhook body: {0}")]
    Body(#[from] axum::Error),

    #[error("Failed to store webhook data: {0}")]
    Storage(#[from] BlobError),
}

/// Successful webhook response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReceipt {
    pub ok: bool,
    pub request_id: String,
    pub provider: &'static str,
    pub fax_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub body_kind: &'static str,
    pub stored: Vec<String>,
    /// Attachments that could not be stored.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

pub(crate) async fn handle(provider: Provider, request: Request, ctx: &ProviderContext<'_>) -> Response {
    match receive(provider, request, ctx).await {
        Ok(receipt) => {
            tracing::info!(
                fax_id = %receipt.fax_id,
                event = receipt.event.as_deref().unwrap_or("-"),
                stored = receipt.stored.len(),
                failed = receipt.failed.len(),
                "Webhook stored"
            );
            (StatusCode::OK, Json(receipt)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook handling failed");
            let body = json!({
                "ok": false,
                "requestId": ctx.request_id,
                "error": e.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn receive(
    provider: Provider,
    request: Request,
    ctx: &ProviderContext<'_>,
) -> Result<WebhookReceipt, WebhookError> {
    let body = read_body(request).await?;
    let event = provider.inspect_webhook(&body);

    let fax_id = event
        .fax_id
        .as_deref()
        .map(store::key_segment)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ctx.request_id.clone());

    tracing::debug!(fax_id = %fax_id, kind = body.kind(), "Decoded webhook body");

    let mut recorder = Recorder::new(provider, &fax_id, ctx.blobs);

    if let WebhookBody::Multipart { files, .. } = &body {
        for part in files {
            recorder.store_file(part).await;
        }
    }

    match event.media {
        Some(MediaRef::Inline { bytes, extension }) => {
            let content_type = mime_guess::from_ext(&extension).first_or_octet_stream();
            recorder
                .store_media(&extension, bytes, content_type.as_ref())
                .await;
        }
        Some(MediaRef::Url { url, extension }) => match provider.authorization(ctx.env) {
            Some(authorization) => {
                if let Some(media) = fetch_media(ctx, &url, &authorization).await {
                    recorder
                        .store_media(&extension, media.bytes, &media.content_type)
                        .await;
                }
            }
            None => tracing::warn!(url = %url, "Skipping media fetch, vendor credentials not configured"),
        },
        None => {}
    }

    // The payload record is the one write a delivery cannot do without
    recorder.store_payload(&body).await?;
    let (stored, failed) = recorder.into_keys();

    Ok(WebhookReceipt {
        ok: true,
        request_id: ctx.request_id.clone(),
        provider: provider.name(),
        fax_id: fax_id.clone(),
        event: event.event_type,
        body_kind: body.kind(),
        stored,
        failed,
    })
}
