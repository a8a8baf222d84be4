//! HumbleFax: HTTP Basic with an access/secret key pair.
//!
//! Inbound faxes are delivered as multipart forms (a `fax` JSON field plus
//! the document as a file part) or as JSON with the document inlined as
//! base64 under `file`.

use super::{auth, post_json, required, Provider, ProviderContext, ProviderSendResult, SendFaxParams};
use crate::config::Config;
use crate::webhook::{MediaRef, WebhookBody, WebhookEvent};
use axum::body::Bytes;
use base64::Engine;
use serde_json::{json, Value};

pub(super) fn authorization(env: &Config) -> Result<String, ProviderSendResult> {
    let access_key = required(&env.humblefax_access_key, "HUMBLEFAX_ACCESS_KEY")?;
    let secret_key = required(&env.humblefax_secret_key, "HUMBLEFAX_SECRET_KEY")?;
    Ok(auth::basic(access_key, secret_key))
}

pub(super) async fn send_fax(
    params: &SendFaxParams,
    ctx: &ProviderContext<'_>,
) -> Result<ProviderSendResult, ProviderSendResult> {
    let authorization = authorization(ctx.env)?;

    let mut body = json!({
        "recipients": [params.to],
        "fileUrl": params.media_url,
        "callbackUrl": ctx.url_for(Provider::HumbleFax.webhook_path()),
    });
    if let Some(from) = &ctx.env.fax_from {
        body["fromNumber"] = json!(from);
    }

    let url = format!("{}/quickSendFax", ctx.env.humblefax_api_base);
    Ok(post_json(ctx, &url, &authorization, &body).await)
}

pub(super) fn inspect_webhook(body: &WebhookBody) -> WebhookEvent {
    let fax_id = body
        .field("faxId")
        .or_else(|| body.json_at("/fax/id"))
        .or_else(|| embedded_fax(body).and_then(|fax| crate::webhook::scalar_string(&fax["id"])))
        .or_else(|| body.field("id"));

    let event_type = body.field("event").or_else(|| body.field("type"));

    WebhookEvent {
        fax_id,
        event_type,
        media: media_ref(body),
    }
}

/// The `fax` field of a multipart or form callback holds JSON as text.
fn embedded_fax(body: &WebhookBody) -> Option<Value> {
    match body {
        WebhookBody::Multipart { .. } | WebhookBody::Form(_) => body
            .field("fax")
            .and_then(|text| serde_json::from_str::<Value>(&text).ok()),
        _ => None,
    }
}

fn media_ref(body: &WebhookBody) -> Option<MediaRef> {
    let extension = body
        .field("fileType")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_else(|| "pdf".to_string());

    if let WebhookBody::Json(value) = body {
        if let Some(encoded) = value.get("file").and_then(Value::as_str) {
            match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
                Ok(bytes) => {
                    return Some(MediaRef::Inline {
                        bytes: Bytes::from(bytes),
                        extension,
                    })
                }
                Err(e) => tracing::warn!(error = %e, "Inline fax file is not valid base64"),
            }
        }
    }

    body.field("fileUrl")
        .map(|url| MediaRef::Url { url, extension })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::FilePart;

    #[test]
    fn test_multipart_fax_json_field() {
        let body = WebhookBody::Multipart {
            fields: vec![
                ("event".to_string(), "IncomingFax".to_string()),
                ("fax".to_string(), r#"{"id": 5150, "pages": 2}"#.to_string()),
            ],
            files: vec![FilePart {
                field: "file".to_string(),
                file_name: Some("5150.pdf".to_string()),
                content_type: "application/pdf".to_string(),
                bytes: Bytes::from_static(b"%PDF"),
            }],
        };
        let event = inspect_webhook(&body);
        assert_eq!(event.fax_id.as_deref(), Some("5150"));
        assert_eq!(event.event_type.as_deref(), Some("IncomingFax"));
        assert!(event.media.is_none());
    }

    #[test]
    fn test_json_inline_file() {
        let body = WebhookBody::Json(json!({
            "fax": { "id": "hf-1" },
            "file": "JVBERi0xLjQ=",
            "fileType": "PDF"
        }));
        let event = inspect_webhook(&body);
        assert_eq!(event.fax_id.as_deref(), Some("hf-1"));
        assert_eq!(
            event.media,
            Some(MediaRef::Inline {
                bytes: Bytes::from_static(b"%PDF-1.4"),
                extension: "pdf".to_string(),
            })
        );
    }

    #[test]
    fn test_json_bad_base64_degrades() {
        let body = WebhookBody::Json(json!({ "faxId": "hf-2", "file": "***" }));
        let event = inspect_webhook(&body);
        assert_eq!(event.fax_id.as_deref(), Some("hf-2"));
        assert!(event.media.is_none());
    }
}
