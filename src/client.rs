//! Client for the gateway's own HTTP API.
//!
//! Wraps the two-step flow: upload the document to `/media`, then ask
//! `/fax/send` to transmit it by key.

use crate::routes::media::UploadResponse;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Gateway response to a send request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub ok: bool,
    pub request_id: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub media_key: Option<String>,
    #[serde(default)]
    pub fax: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    /// HTTP status of the gateway response (mirrors the vendor's).
    #[serde(skip)]
    pub status: u16,
}

pub struct FaxClient {
    base_url: String,
    credentials: Option<(String, String)>,
    http: reqwest::Client,
}

impl FaxClient {
    pub fn new(base_url: impl Into<String>, credentials: Option<(String, String)>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            http: reqwest::Client::new(),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    /// Uploads a document and returns its media key and public URL.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: Option<&str>,
    ) -> Result<UploadResponse, ClientError> {
        let mut url = Url::parse(&format!("{}/media", self.base_url))?;
        if let Some(name) = filename {
            url.query_pairs_mut().append_pair("filename", name);
        }

        let response = self
            .authorize(self.http.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &response.bytes().await?));
        }
        Ok(response.json::<UploadResponse>().await?)
    }

    /// Sends a previously uploaded document.
    ///
    /// A vendor rejection is not an error here: the outcome carries
    /// `ok = false` and the vendor's status.
    pub async fn send(&self, to: &str, media_key: &str) -> Result<SendOutcome, ClientError> {
        let response = self
            .authorize(self.http.post(format!("{}/fax/send", self.base_url)))
            .json(&serde_json::json!({ "to": to, "media_key": media_key }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        match serde_json::from_slice::<SendOutcome>(&bytes) {
            Ok(mut outcome) => {
                outcome.status = status;
                Ok(outcome)
            }
            Err(_) => Err(api_error(status, &bytes)),
        }
    }

    /// Upload-then-send in one call.
    pub async fn send_document(
        &self,
        to: &str,
        bytes: Vec<u8>,
        content_type: &str,
        filename: Option<&str>,
    ) -> Result<SendOutcome, ClientError> {
        let upload = self.upload(bytes, content_type, filename).await?;
        tracing::debug!(key = %upload.key, "Uploaded document");
        self.send(to, &upload.key).await
    }
}

fn api_error(status: u16, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    ClientError::Api { status, message }
}
