//! Normalized storage layout for inbound webhooks.
//!
//! Keys:
//! - `<provider>:fax:<id>:<filename-or-field>` for multipart file parts
//! - `<provider>:fax:<id>.<ext>` for media fetched by URL or inlined
//! - `<provider>:fax:<id>:json|fields|raw` for the payload itself
//!
//! Attachment names are unique within one delivery and never take a
//! payload suffix: a second `scan.pdf` becomes `scan-2.pdf`, a file part
//! called `fields` becomes `fields-2`. Naming is deterministic, so a
//! redelivered webhook overwrites the earlier objects under the same keys.

use super::body::{FilePart, WebhookBody};
use crate::provider::Provider;
use crate::storage::{BlobError, BlobStore};
use axum::body::Bytes;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const JSON_SUFFIX: &str = "json";
pub const FIELDS_SUFFIX: &str = "fields";
pub const RAW_SUFFIX: &str = "raw";

const PAYLOAD_SUFFIXES: [&str; 3] = [JSON_SUFFIX, FIELDS_SUFFIX, RAW_SUFFIX];

pub fn fax_key(provider: Provider, fax_id: &str, suffix: &str) -> String {
    format!("{}:fax:{}:{}", provider.name(), fax_id, suffix)
}

pub fn fax_media_key(provider: Provider, fax_id: &str, extension: &str) -> String {
    format!("{}:fax:{}.{}", provider.name(), fax_id, extension)
}

/// Makes a vendor-supplied value safe to embed in a key.
pub fn key_segment(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c.is_control() || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Last path component of an uploaded file name, falling back to the form
/// field name.
fn part_name(part: &FilePart) -> String {
    let from_file = part
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(key_segment)
        .filter(|name| !name.is_empty() && name != "." && name != "..");

    from_file
        .or_else(|| Some(key_segment(&part.field)).filter(|f| !f.is_empty()))
        .unwrap_or_else(|| "file".to_string())
}

/// `scan.pdf` + 2 -> `scan-2.pdf`; `fields` + 2 -> `fields-2`.
fn numbered(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{}-{}", name, n),
    }
}

/// Writes the objects for one webhook delivery and remembers their keys.
///
/// Attachment and media writes are best-effort: a failure is logged and
/// reported by [`Recorder::into_keys`], and the delivery carries on. Only the
/// payload record is required.
pub struct Recorder<'a> {
    provider: Provider,
    fax_id: &'a str,
    blobs: &'a dyn BlobStore,
    names: HashSet<String>,
    stored: Vec<String>,
    failed: Vec<String>,
}

impl<'a> Recorder<'a> {
    pub fn new(provider: Provider, fax_id: &'a str, blobs: &'a dyn BlobStore) -> Self {
        Self {
            provider,
            fax_id,
            blobs,
            names: PAYLOAD_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            stored: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Claims a name for an attachment, numbering repeats.
    fn claim_name(&mut self, name: String) -> String {
        let mut candidate = name.clone();
        let mut n = 2;
        while self.names.contains(&candidate) {
            candidate = numbered(&name, n);
            n += 1;
        }
        self.names.insert(candidate.clone());
        candidate
    }

    async fn put(&mut self, key: String, bytes: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.blobs.put(&key, bytes, content_type).await?;
        tracing::debug!(key = %key, content_type, "Stored webhook object");
        self.stored.push(key);
        Ok(())
    }

    async fn put_best_effort(&mut self, key: String, bytes: Bytes, content_type: &str) {
        if let Err(e) = self.put(key.clone(), bytes, content_type).await {
            tracing::warn!(key = %key, error = %e, "Failed to store webhook attachment");
            self.failed.push(key);
        }
    }

    pub async fn store_file(&mut self, part: &FilePart) {
        let name = self.claim_name(part_name(part));
        let key = fax_key(self.provider, self.fax_id, &name);
        self.put_best_effort(key, part.bytes.clone(), &part.content_type)
            .await
    }

    pub async fn store_media(&mut self, extension: &str, bytes: Bytes, content_type: &str) {
        let key = fax_media_key(self.provider, self.fax_id, &key_segment(extension));
        self.put_best_effort(key, bytes, content_type).await
    }

    /// Stores the payload record. Every decoded body produces one.
    pub async fn store_payload(&mut self, body: &WebhookBody) -> Result<(), BlobError> {
        let (suffix, bytes, content_type) = match body {
            WebhookBody::Json(value) => (JSON_SUFFIX, to_json_bytes(value), "application/json"),
            WebhookBody::Multipart { fields, .. } | WebhookBody::Form(fields) => {
                let object: Map<String, Value> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                (FIELDS_SUFFIX, to_json_bytes(&Value::Object(object)), "application/json")
            }
            WebhookBody::Text { content_type, text } => (
                RAW_SUFFIX,
                Bytes::from(text.clone()),
                content_type.as_deref().unwrap_or("text/plain"),
            ),
        };
        let key = fax_key(self.provider, self.fax_id, suffix);
        self.put(key, bytes, content_type).await
    }

    /// Returns `(stored, failed)` keys.
    pub fn into_keys(self) -> (Vec<String>, Vec<String>) {
        (self.stored, self.failed)
    }
}

fn to_json_bytes(value: &Value) -> Bytes {
    // Serializing a Value cannot fail
    Bytes::from(serde_json::to_vec(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobStore;
    use serde_json::json;

    fn part(field: &str, file_name: Option<&str>) -> FilePart {
        FilePart {
            field: field.to_string(),
            file_name: file_name.map(str::to_string),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF"),
        }
    }

    #[test]
    fn test_keys() {
        assert_eq!(fax_key(Provider::Documo, "m-1", "raw"), "documo:fax:m-1:raw");
        assert_eq!(fax_media_key(Provider::Telnyx, "f-1", "pdf"), "telnyx:fax:f-1.pdf");
        assert_eq!(key_segment(" a b\n"), "a_b_");
    }

    #[test]
    fn test_part_name() {
        assert_eq!(part_name(&part("file", Some("scan.pdf"))), "scan.pdf");
        assert_eq!(part_name(&part("file", Some("C:\\faxes\\scan.pdf"))), "scan.pdf");
        assert_eq!(part_name(&part("file", Some("../../etc/passwd"))), "passwd");
        assert_eq!(part_name(&part("attachment", Some(""))), "attachment");
        assert_eq!(part_name(&part("attachment", None)), "attachment");
        assert_eq!(part_name(&part("", None)), "file");
    }

    #[tokio::test]
    async fn test_payload_records() {
        let blobs = MemoryBlobStore::new();
        let mut recorder = Recorder::new(Provider::HumbleFax, "9", &blobs);

        recorder
            .store_payload(&WebhookBody::Form(vec![("faxId".to_string(), "9".to_string())]))
            .await
            .unwrap();
        recorder
            .store_payload(&WebhookBody::Text {
                content_type: None,
                text: "hello".to_string(),
            })
            .await
            .unwrap();

        let (stored, failed) = recorder.into_keys();
        assert_eq!(
            stored,
            vec!["humblefax:fax:9:fields".to_string(), "humblefax:fax:9:raw".to_string()]
        );
        assert!(failed.is_empty());

        let fields = blobs.get("humblefax:fax:9:fields").await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&fields.bytes).unwrap(),
            json!({ "faxId": "9" })
        );
        let raw = blobs.get("humblefax:fax:9:raw").await.unwrap().unwrap();
        assert_eq!(raw.content_type, "text/plain");
        assert_eq!(raw.bytes, Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_numbered() {
        assert_eq!(numbered("scan.pdf", 2), "scan-2.pdf");
        assert_eq!(numbered("fields", 3), "fields-3");
        assert_eq!(numbered(".hidden", 2), ".hidden-2");
        assert_eq!(numbered("a.tar.gz", 2), "a.tar-2.gz");
    }

    #[tokio::test]
    async fn test_repeated_file_names_are_kept_apart() {
        let blobs = MemoryBlobStore::new();
        let mut recorder = Recorder::new(Provider::HumbleFax, "F1", &blobs);

        let mut page1 = part("page1", Some("scan.pdf"));
        page1.bytes = Bytes::from_static(b"page one");
        let mut page2 = part("page2", Some("scan.pdf"));
        page2.bytes = Bytes::from_static(b"page two");
        let mut page3 = part("page3", Some("scan.pdf"));
        page3.bytes = Bytes::from_static(b"page three");

        recorder.store_file(&page1).await;
        recorder.store_file(&page2).await;
        recorder.store_file(&page3).await;

        let (stored, failed) = recorder.into_keys();
        assert!(failed.is_empty());
        assert_eq!(
            stored,
            vec![
                "humblefax:fax:F1:scan.pdf".to_string(),
                "humblefax:fax:F1:scan-2.pdf".to_string(),
                "humblefax:fax:F1:scan-3.pdf".to_string(),
            ]
        );
        for (key, expected) in [
            ("humblefax:fax:F1:scan.pdf", &b"page one"[..]),
            ("humblefax:fax:F1:scan-2.pdf", &b"page two"[..]),
            ("humblefax:fax:F1:scan-3.pdf", &b"page three"[..]),
        ] {
            assert_eq!(&blobs.get(key).await.unwrap().unwrap().bytes[..], expected);
        }
    }

    #[tokio::test]
    async fn test_attachments_never_take_payload_keys() {
        let blobs = MemoryBlobStore::new();
        let mut recorder = Recorder::new(Provider::HumbleFax, "F1", &blobs);

        let mut attachment = part("upload", Some("fields"));
        attachment.bytes = Bytes::from_static(b"attachment bytes");
        recorder.store_file(&attachment).await;
        recorder.store_file(&part("json", None)).await;
        recorder
            .store_payload(&WebhookBody::Multipart {
                fields: vec![("faxId".to_string(), "F1".to_string())],
                files: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(
            blobs.keys().await,
            vec![
                "humblefax:fax:F1:fields".to_string(),
                "humblefax:fax:F1:fields-2".to_string(),
                "humblefax:fax:F1:json-2".to_string(),
            ]
        );
        let attachment = blobs.get("humblefax:fax:F1:fields-2").await.unwrap().unwrap();
        assert_eq!(attachment.bytes, Bytes::from_static(b"attachment bytes"));
        let payload = blobs.get("humblefax:fax:F1:fields").await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&payload.bytes).unwrap(),
            json!({ "faxId": "F1" })
        );
    }
}
