//! `POST /fax/send`: store (or look up) the document, then hand it to the
//! configured provider.

use super::media::{media_blob_key, media_path, normalize_media_key, store_media, upload_content_type};
use super::{request_id, AppState};
use crate::error::{ApiError, AppError};
use crate::provider::{resolve_provider, ProviderSendResult, SendFaxParams, VendorBody};
use crate::storage::BlobStore;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON form of a send request, referencing a previously uploaded document.
#[derive(Debug, Deserialize)]
pub struct SendFaxRequest {
    pub to: String,
    #[serde(alias = "mediaKey")]
    pub media_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFaxResponse {
    pub ok: bool,
    pub request_id: String,
    pub provider: &'static str,
    pub media_key: String,
    pub fax: Option<VendorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An uploaded file from a multipart send request.
struct Upload {
    bytes: Bytes,
    content_type: String,
    file_name: Option<String>,
}

enum SendInput {
    Upload { to: String, upload: Upload },
    Stored { to: String, media_key: String },
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn read_multipart(request: Request) -> Result<SendInput, AppError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut to = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("to") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                to = Some(text);
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let declared = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                upload = Some(Upload {
                    content_type: upload_content_type(declared.as_deref(), file_name.as_deref()),
                    bytes,
                    file_name,
                });
            }
            _ => {}
        }
    }

    let to = to.ok_or_else(|| AppError::BadRequest("missing field `to`".to_string()))?;
    let upload = upload
        .filter(|u| !u.bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing field `file`".to_string()))?;
    Ok(SendInput::Upload { to, upload })
}

async fn read_json(request: Request) -> Result<SendInput, AppError> {
    let Json(body) = Json::<SendFaxRequest>::from_request(request, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(SendInput::Stored {
        to: body.to,
        media_key: normalize_media_key(&body.media_key).to_string(),
    })
}

/// Resolves the input to `(to, media_key)`, storing uploads first.
async fn prepare(input: SendInput, blobs: &dyn BlobStore) -> Result<(String, String), AppError> {
    let (to, media_key) = match input {
        SendInput::Upload { to, upload } => {
            let key = store_media(
                blobs,
                upload.bytes,
                &upload.content_type,
                upload.file_name.as_deref(),
            )
            .await?;
            (to, key)
        }
        SendInput::Stored { to, media_key } => {
            if media_key.is_empty() || blobs.get(&media_blob_key(&media_key)).await?.is_none() {
                return Err(AppError::BadRequest(format!("unknown media_key {:?}", media_key)));
            }
            (to, media_key)
        }
    };

    let to = to.trim().to_string();
    if to.is_empty() {
        return Err(AppError::BadRequest("missing field `to`".to_string()));
    }
    Ok((to, media_key))
}

pub async fn send_fax(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let id = request_id(request.headers());
    let headers = request.headers().clone();

    // Unknown providers fail before the body is touched
    let provider = resolve_provider(state.config.fax_provider.as_deref())
        .map_err(|e| AppError::from(e).for_request(&id))?;

    let input = if is_multipart(&request) {
        read_multipart(request).await
    } else {
        read_json(request).await
    }
    .map_err(|e| e.for_request(&id))?;

    let (to, media_key) = prepare(input, state.blobs.as_ref())
        .await
        .map_err(|e| e.for_request(&id))?;

    let ctx = state.context(id.clone(), &headers);
    let params = SendFaxParams {
        to,
        media_url: ctx.url_for(&media_path(&media_key)),
    };

    tracing::info!(request_id = %id, provider = provider.name(), to = %params.to, "Sending fax");
    let result = provider.send_fax(&params, &ctx).await;

    Ok(send_response(id, provider.name(), media_key, result))
}

fn send_response(
    request_id: String,
    provider: &'static str,
    media_key: String,
    result: ProviderSendResult,
) -> Response {
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let error = result.error_message();
    let body = SendFaxResponse {
        ok: result.ok,
        request_id,
        provider,
        media_key,
        fax: result.fax,
        error,
    };
    (status, Json(body)).into_response()
}
