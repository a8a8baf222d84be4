use fax_gateway::{config::Config, provider::resolve_provider, routes, storage};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fax_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Starting fax gateway on port {}", config.port);

    // Resolved per request as well; this only surfaces typos early
    match resolve_provider(config.fax_provider.as_deref()) {
        Ok(provider) => tracing::info!(provider = provider.name(), "Fax provider selected"),
        Err(e) => tracing::error!(error = %e, "Fax sends will fail until FAX_PROVIDER is fixed"),
    }
    if !config.auth_enabled() {
        tracing::warn!("BASIC_AUTH_USER/BASIC_AUTH_PASS not set, client routes are unauthenticated");
    }

    let blobs: Arc<dyn storage::BlobStore> = match &config.blob_dir {
        Some(dir) => match storage::FsBlobStore::open(dir).await {
            Ok(store) => {
                tracing::info!(dir = %dir, "Using filesystem blob store");
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!(dir = %dir, error = %e, "Failed to open blob store");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("BLOB_DIR not set, blobs are kept in memory only");
            Arc::new(storage::MemoryBlobStore::new())
        }
    };

    let port = config.port;
    let state = routes::AppState::new(config, blobs);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on http://{}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
