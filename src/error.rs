use crate::provider::ProviderError;
use crate::storage::BlobError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Blob(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Provider(_) => "PROVIDER_NOT_CONFIGURED",
            AppError::Blob(_) => "STORAGE_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Attaches the correlation id of the failing request.
    pub fn for_request(self, request_id: &str) -> ApiError {
        ApiError {
            request_id: request_id.to_string(),
            error: self,
        }
    }
}

/// An [`AppError`] tied to a request, rendered as
/// `{ ok: false, requestId, error, code }`.
#[derive(Debug)]
pub struct ApiError {
    pub request_id: String,
    pub error: AppError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        if status.is_server_error() {
            tracing::error!(request_id = %self.request_id, error = %self.error, "Request failed");
        } else {
            tracing::debug!(request_id = %self.request_id, error = %self.error, "Request rejected");
        }

        let body = Json(json!({
            "ok": false,
            "requestId": self.request_id,
            "error": self.error.to_string(),
            "code": self.error.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[tokio::test]
    async fn test_unknown_provider_response() {
        let response = AppError::from(ProviderError::Unknown("acme".to_string()))
            .for_request("req-7")
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["requestId"], "req-7");
        assert_eq!(body["error"], "Unknown fax provider: acme");
        assert_eq!(body["code"], "PROVIDER_NOT_CONFIGURED");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
