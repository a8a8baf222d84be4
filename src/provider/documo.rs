//! Documo: HTTP Basic with the API key as user and an empty password.
//!
//! Status callbacks are usually url-encoded forms keyed by `messageId`;
//! inbound faxes carry a `mediaUrl` (or `downloadUrl`) that is fetched with
//! the same basic credentials.

use super::{auth, post_json, required, Provider, ProviderContext, ProviderSendResult, SendFaxParams};
use crate::config::Config;
use crate::webhook::{MediaRef, WebhookBody, WebhookEvent};
use serde_json::{json, Map, Value};

pub(super) fn authorization(env: &Config) -> Result<String, ProviderSendResult> {
    let api_key = required(&env.documo_api_key, "DOCUMO_API_KEY")?;
    Ok(auth::basic(api_key, ""))
}

pub(super) async fn send_fax(
    params: &SendFaxParams,
    ctx: &ProviderContext<'_>,
) -> Result<ProviderSendResult, ProviderSendResult> {
    let authorization = authorization(ctx.env)?;

    let mut body = Map::new();
    body.insert("faxNumber".to_string(), json!(params.to));
    body.insert("attachmentUrl".to_string(), json!(params.media_url));
    body.insert(
        "webhookUrl".to_string(),
        json!(ctx.url_for(Provider::Documo.webhook_path())),
    );
    if let Some(from) = &ctx.env.fax_from {
        body.insert("callerId".to_string(), json!(from));
    }

    let url = format!("{}/v1/faxes", ctx.env.documo_api_base);
    Ok(post_json(ctx, &url, &authorization, &Value::Object(body)).await)
}

pub(super) fn inspect_webhook(body: &WebhookBody) -> WebhookEvent {
    let fax_id = body
        .field("messageId")
        .or_else(|| body.json_at("/data/messageId"))
        .or_else(|| body.field("id"));

    let event_type = body.field("status").or_else(|| body.field("event"));

    let media = body
        .field("mediaUrl")
        .or_else(|| body.field("downloadUrl"))
        .map(|url| MediaRef::Url {
            url,
            extension: "pdf".to_string(),
        });

    WebhookEvent {
        fax_id,
        event_type,
        media,
    }
}
