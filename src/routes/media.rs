//! Outbound media: uploads from clients and public downloads for vendors.
//!
//! Documents live under `media:<key>` where `key` is `<uuid>.<ext>`; the
//! public URL handed to vendors is `<base_url>/media/<key>`.

use super::{request_id, AppState};
use crate::error::{ApiError, AppError};
use crate::storage::{BlobError, BlobStore};
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

pub const MEDIA_PREFIX: &str = "media:";

pub fn media_blob_key(key: &str) -> String {
    format!("{}{}", MEDIA_PREFIX, key)
}

pub fn media_path(key: &str) -> String {
    format!("/media/{}", key)
}

/// Accepts keys with or without the `media:` prefix.
pub fn normalize_media_key(key: &str) -> &str {
    let key = key.trim();
    key.strip_prefix(MEDIA_PREFIX).unwrap_or(key)
}

/// Picks a file extension from the upload's file name or content type.
fn media_extension(content_type: &str, file_name: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name
        .or_else(|| {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            mime_guess::get_mime_extensions_str(essence)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// Resolves the content type of an upload: declared type first, then a
/// guess from the file name.
pub fn upload_content_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && !ct.eq_ignore_ascii_case("application/octet-stream"))
        .map(str::to_string)
        .or_else(|| {
            file_name.and_then(|name| mime_guess::from_path(name).first().map(|m| m.to_string()))
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Stores an outbound document and returns its media key.
pub async fn store_media(
    blobs: &dyn BlobStore,
    bytes: Bytes,
    content_type: &str,
    file_name: Option<&str>,
) -> Result<String, BlobError> {
    let key = format!(
        "{}.{}",
        uuid::Uuid::new_v4(),
        media_extension(content_type, file_name)
    );
    blobs.put(&media_blob_key(&key), bytes, content_type).await?;
    tracing::debug!(key = %key, content_type, "Stored outbound media");
    Ok(key)
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub ok: bool,
    pub request_id: String,
    pub key: String,
    pub url: String,
}

pub async fn upload_media(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let id = request_id(&headers);

    if body.is_empty() {
        return Err(AppError::BadRequest("empty upload".to_string()).for_request(&id));
    }

    let declared = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let content_type = upload_content_type(declared, query.filename.as_deref());

    let key = store_media(state.blobs.as_ref(), body, &content_type, query.filename.as_deref())
        .await
        .map_err(|e| AppError::from(e).for_request(&id))?;

    let url = format!("{}{}", state.base_url(&headers), media_path(&key));
    tracing::info!(request_id = %id, key = %key, "Media uploaded");

    Ok(Json(UploadResponse {
        ok: true,
        request_id: id,
        key,
        url,
    }))
}

pub async fn get_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = request_id(&headers);
    let key = normalize_media_key(&key);

    let object = state
        .blobs
        .get(&media_blob_key(key))
        .await
        .map_err(|e| AppError::from(e).for_request(&id))?
        .ok_or_else(|| AppError::NotFound(format!("media {}", key)).for_request(&id))?;

    tracing::debug!(request_id = %id, key, size = object.bytes.len(), "Serving media");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, object.content_type)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from(object.bytes))
        .map_err(|e| AppError::Internal(e.to_string()).for_request(&id))
}
