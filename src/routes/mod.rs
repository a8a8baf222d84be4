//! HTTP surface of the gateway.
//!
//! Client-facing routes (`/fax/send`, `/media` uploads) sit behind basic
//! auth. Health, media downloads and vendor webhooks are public: vendors
//! fetch media and post webhooks without our credentials.

pub mod auth;
pub mod fax;
pub mod health;
pub mod media;
pub mod webhook;

use crate::config::Config;
use crate::provider::{Provider, ProviderContext};
use crate::storage::BlobStore;
use crate::webhook::body::MAX_WEBHOOK_BODY;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::HeaderMap,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Shared, read-only state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub blobs: Arc<dyn BlobStore>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            config: Arc::new(config),
            blobs,
            http: reqwest::Client::new(),
        }
    }

    /// Builds the per-request provider context.
    pub fn context(&self, request_id: String, headers: &HeaderMap) -> ProviderContext<'_> {
        let base_url = self.base_url(headers);
        ProviderContext::new(request_id, base_url, &self.config, self.blobs.as_ref(), &self.http)
    }

    /// Public origin: `PUBLIC_BASE_URL` when configured, else the forwarded
    /// or direct host of the request.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.config.public_base_url {
            return url.clone();
        }

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let proto = header("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
        let host = header("x-forwarded-host")
            .or_else(|| header("host"))
            .unwrap_or_else(|| format!("localhost:{}", self.config.port));

        format!("{}://{}", proto, host)
    }
}

/// Correlation id for a request: the caller's `x-request-id` when it looks
/// sane, otherwise a fresh UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/fax/send", post(fax::send_fax))
        .route("/media", post(media::upload_media))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));

    let mut public = Router::new()
        .route("/health", get(health::health_check))
        .route("/media/:key", get(media::get_media));

    for provider in Provider::ALL {
        public = public.route(
            provider.webhook_path(),
            post(move |State(state): State<AppState>, request: Request| {
                webhook::receive_webhook(provider, state, request)
            }),
        );
    }

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY))
        .with_state(state)
}
