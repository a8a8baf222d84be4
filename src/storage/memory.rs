//! In-memory blob store, used when no `BLOB_DIR` is configured and in tests.

use super::{validate_key, BlobFuture, BlobObject, BlobStore};
use axum::body::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, BlobObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored keys in sorted order.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put<'a>(&'a self, key: &'a str, bytes: Bytes, content_type: &'a str) -> BlobFuture<'a, ()> {
        Box::pin(async move {
            validate_key(key)?;
            let object = BlobObject {
                bytes,
                content_type: content_type.to_string(),
            };
            self.objects.write().await.insert(key.to_string(), object);
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BlobFuture<'a, Option<BlobObject>> {
        Box::pin(async move {
            validate_key(key)?;
            Ok(self.objects.read().await.get(key).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlobError;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryBlobStore::new();
        store
            .put("media:a.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        let object = store.get("media:a.pdf").await.unwrap().unwrap();
        assert_eq!(object.bytes, Bytes::from_static(b"%PDF"));
        assert_eq!(object.content_type, "application/pdf");
        assert!(store.get("media:missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryBlobStore::new();
        store.put("k", Bytes::from_static(b"one"), "text/plain").await.unwrap();
        store.put("k", Bytes::from_static(b"two"), "text/plain").await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("k").await.unwrap().unwrap().bytes, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_rejects_empty_key() {
        let store = MemoryBlobStore::new();
        assert!(store.put("", Bytes::new(), "text/plain").await.is_err());
        assert!(store.is_empty().await);
        assert!(matches!(store.get("").await, Err(BlobError::InvalidKey(_))));
        assert!(matches!(store.get("bad\nkey").await, Err(BlobError::InvalidKey(_))));
    }
}
