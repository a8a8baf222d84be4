//! Telnyx: bearer-token API with JSON webhooks.
//!
//! Outbound faxes go to `POST /v2/faxes`. Webhooks arrive as
//! `{ "data": { "event_type", "id", "payload": { "fax_id", "media_url", .. } } }`;
//! for `fax.received` events the document is only referenced by URL and is
//! downloaded with the same bearer token.

use super::{auth, post_json, required, Provider, ProviderContext, ProviderSendResult, SendFaxParams};
use crate::config::Config;
use crate::webhook::{MediaRef, WebhookBody, WebhookEvent};
use serde_json::json;

const RECEIVED_EVENT: &str = "fax.received";

pub(super) fn authorization(env: &Config) -> Result<String, ProviderSendResult> {
    let api_key = required(&env.telnyx_api_key, "TELNYX_API_KEY")?;
    Ok(auth::bearer(api_key))
}

pub(super) async fn send_fax(
    params: &SendFaxParams,
    ctx: &ProviderContext<'_>,
) -> Result<ProviderSendResult, ProviderSendResult> {
    let authorization = authorization(ctx.env)?;
    let connection_id = required(&ctx.env.telnyx_connection_id, "TELNYX_CONNECTION_ID")?;
    let from = required(&ctx.env.fax_from, "FAX_FROM")?;

    let body = json!({
        "connection_id": connection_id,
        "to": params.to,
        "from": from,
        "media_url": params.media_url,
        "webhook_url": ctx.url_for(Provider::Telnyx.webhook_path()),
    });

    let url = format!("{}/v2/faxes", ctx.env.telnyx_api_base);
    Ok(post_json(ctx, &url, &authorization, &body).await)
}

pub(super) fn inspect_webhook(body: &WebhookBody) -> WebhookEvent {
    let event_type = body
        .json_at("/data/event_type")
        .or_else(|| body.field("event_type"));

    let fax_id = body
        .json_at("/data/payload/fax_id")
        .or_else(|| body.json_at("/data/id"))
        .or_else(|| body.field("fax_id"))
        .or_else(|| body.field("id"));

    let media = match event_type.as_deref() {
        Some(RECEIVED_EVENT) => body
            .json_at("/data/payload/media_url")
            .or_else(|| body.field("media_url"))
            .map(|url| MediaRef::Url {
                url,
                extension: "pdf".to_string(),
            }),
        _ => None,
    };

    WebhookEvent {
        fax_id,
        event_type,
        media,
    }
}
