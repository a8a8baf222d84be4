//! Filesystem blob store.
//!
//! Each object is one file under `<root>/objects/`: the content type on the
//! first line, then the raw bytes. Writes go to `<root>/tmp/` first and are
//! renamed into place, so a reader sees either the old object or the new
//! one, never bytes from one write with the content type of another.
//!
//! File names are the form-url-encoded key, so `:` and `/` never reach the
//! filesystem. Keys whose encoded name would exceed [`MAX_NAME_LEN`] are
//! stored under `~<sha256 of key>` instead; `~` is always percent-encoded
//! by the form encoder, so hashed names cannot collide with plain ones.

use super::{validate_key, BlobError, BlobFuture, BlobObject, BlobStore};
use axum::body::Bytes;
use sha2::{Digest, Sha256};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Longest file name written as-is. Most filesystems cap names at 255 bytes.
pub const MAX_NAME_LEN: usize = 200;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens (and creates, if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(root.join("objects")).await?;
        tokio::fs::create_dir_all(root.join("tmp")).await?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(file_name(key))
    }
}

fn file_name(key: &str) -> String {
    let name: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
    if name.len() > MAX_NAME_LEN {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        return format!("~{:x}", hasher.finalize());
    }
    // "." and ".." survive form encoding
    match name.as_str() {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => name,
    }
}

fn encode_object(bytes: &[u8], content_type: &str) -> Vec<u8> {
    let content_type: String = content_type.chars().filter(|c| !c.is_control()).collect();
    let mut data = Vec::with_capacity(content_type.len() + 1 + bytes.len());
    data.extend_from_slice(content_type.as_bytes());
    data.push(b'\n');
    data.extend_from_slice(bytes);
    data
}

fn decode_object(data: Vec<u8>) -> io::Result<BlobObject> {
    let data = Bytes::from(data);
    let split = data
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidData, "blob file has no content type header"))?;
    let content_type = String::from_utf8_lossy(&data[..split]).into_owned();
    Ok(BlobObject {
        bytes: data.slice(split + 1..),
        content_type,
    })
}

impl BlobStore for FsBlobStore {
    fn put<'a>(&'a self, key: &'a str, bytes: Bytes, content_type: &'a str) -> BlobFuture<'a, ()> {
        Box::pin(async move {
            validate_key(key)?;
            let temp_path = self.root.join("tmp").join(uuid::Uuid::new_v4().to_string());
            tokio::fs::write(&temp_path, encode_object(&bytes, content_type)).await?;

            if let Err(e) = tokio::fs::rename(&temp_path, self.object_path(key)).await {
                tokio::fs::remove_file(&temp_path).await.ok();
                return Err(e.into());
            }

            tracing::debug!(key, size = bytes.len(), "Stored blob");
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BlobFuture<'a, Option<BlobObject>> {
        Box::pin(async move {
            validate_key(key)?;
            let data = match tokio::fs::read(self.object_path(key)).await {
                Ok(data) => data,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            Ok(Some(decode_object(data)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_with_colon_keys() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(root.path()).await.unwrap();

        store
            .put("humblefax:fax:42:scan.pdf", Bytes::from_static(b"%PDF-1.4\n\x00binary"), "application/pdf")
            .await
            .unwrap();

        let object = store.get("humblefax:fax:42:scan.pdf").await.unwrap().unwrap();
        assert_eq!(object.bytes, Bytes::from_static(b"%PDF-1.4\n\x00binary"));
        assert_eq!(object.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(root.path()).await.unwrap();
        assert!(store.get("media:nope.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_path_separators_stay_inside_root() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(root.path()).await.unwrap();
        let object_path = store.object_path("../../etc/passwd");
        assert_eq!(object_path.parent(), Some(root.path().join("objects").as_path()));
        assert_eq!(file_name(".."), "%2E%2E");
    }

    #[tokio::test]
    async fn test_long_keys_are_hashed() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(root.path()).await.unwrap();

        let long_a = format!("humblefax:fax:1:{}a.pdf", "x".repeat(250));
        let long_b = format!("humblefax:fax:1:{}b.pdf", "x".repeat(250));
        assert!(file_name(&long_a).starts_with('~'));
        assert!(file_name(&long_a).len() <= MAX_NAME_LEN);
        assert_ne!(file_name(&long_a), file_name(&long_b));

        store.put(&long_a, Bytes::from_static(b"A"), "application/pdf").await.unwrap();
        store.put(&long_b, Bytes::from_static(b"B"), "application/pdf").await.unwrap();
        assert_eq!(store.get(&long_a).await.unwrap().unwrap().bytes, Bytes::from_static(b"A"));
        assert_eq!(store.get(&long_b).await.unwrap().unwrap().bytes, Bytes::from_static(b"B"));

        // short keys never take the hashed form, even when they contain '~'
        assert_eq!(file_name("media:~x"), "media%3A%7Ex");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_bytes_and_type_together() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(root.path()).await.unwrap();

        store.put("k", Bytes::from_static(b"one"), "text/plain").await.unwrap();
        store.put("k", Bytes::from_static(b"%PDF"), "application/pdf").await.unwrap();

        let object = store.get("k").await.unwrap().unwrap();
        assert_eq!(object.bytes, Bytes::from_static(b"%PDF"));
        assert_eq!(object.content_type, "application/pdf");

        // nothing left behind in the staging directory
        let mut staged = tokio::fs::read_dir(root.path().join("tmp")).await.unwrap();
        assert!(staged.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writes_stay_consistent() {
        let root = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsBlobStore::open(root.path()).await.unwrap());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let (bytes, content_type) = if i % 2 == 0 {
                    (Bytes::from_static(b"%PDF"), "application/pdf")
                } else {
                    (Bytes::from_static(b"II*\0"), "image/tiff")
                };
                store.put("documo:fax:7.pdf", bytes, content_type).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let object = store.get("documo:fax:7.pdf").await.unwrap().unwrap();
        match object.content_type.as_str() {
            "application/pdf" => assert_eq!(object.bytes, Bytes::from_static(b"%PDF")),
            "image/tiff" => assert_eq!(object.bytes, Bytes::from_static(b"II*\0")),
            other => panic!("unexpected content type {}", other),
        }
    }
}
