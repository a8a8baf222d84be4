//! Blob storage abstraction.
//!
//! The gateway treats storage as an opaque key -> bytes + content type
//! capability. Keys follow the conventions described in
//! [`crate::webhook::store`] and [`crate::routes::media`]; there is no
//! structure beyond the key itself.

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use axum::body::Bytes;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobObject {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Invalid blob key: {0:?}")]
    InvalidKey(String),

    #[error("Blob storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type BlobFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BlobError>> + Send + 'a>>;

/// Trait for durable key-value byte storage.
///
/// Writes are unconditional: a second `put` for the same key replaces the
/// first (last write wins).
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` with the given content type.
    fn put<'a>(&'a self, key: &'a str, bytes: Bytes, content_type: &'a str) -> BlobFuture<'a, ()>;

    /// Fetches the object stored under `key`, or `None` when missing.
    fn get<'a>(&'a self, key: &'a str) -> BlobFuture<'a, Option<BlobObject>>;
}

pub(crate) fn validate_key(key: &str) -> Result<(), BlobError> {
    if key.is_empty() || key.chars().any(char::is_control) {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("media:abc.pdf").is_ok());
        assert!(validate_key("telnyx:fax:123:json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("bad\nkey").is_err());
    }
}
