pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod routes;
pub mod storage;
pub mod webhook;

pub use client::FaxClient;
pub use config::Config;
pub use provider::{resolve_provider, Provider, ProviderContext, ProviderSendResult, SendFaxParams};
pub use routes::{router, AppState};
pub use storage::{BlobStore, FsBlobStore, MemoryBlobStore};
