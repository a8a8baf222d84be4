use super::{request_id, AppState};
use crate::provider::Provider;
use axum::{extract::Request, response::Response};

/// Hands a vendor webhook to its provider with a fresh request context.
pub async fn receive_webhook(provider: Provider, state: AppState, request: Request) -> Response {
    let id = request_id(request.headers());
    let ctx = state.context(id, request.headers());
    tracing::debug!(request_id = %ctx.request_id, provider = provider.name(), "Webhook received");
    provider.handle_webhook(request, &ctx).await
}
