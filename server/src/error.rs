use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use smartkeep_core::SearchError;

/// Handler error. Every variant renders as `{"kind": ..., "detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Retrieval, benchmark and evaluation failures (4xx).
    Search(SearchError),
    /// Malformed parameters or body (400).
    BadRequest(String),
    /// Unknown document (404).
    NotFound(String),
    /// The page behind a submitted URL could not be fetched or read (422).
    FetchFailed(String),
    /// Store or other unexpected failure (500).
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Search(SearchError::IndexUnavailable) => (StatusCode::CONFLICT, "index_unavailable"),
            ApiError::Search(e) => (StatusCode::BAD_REQUEST, e.kind()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::FetchFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "fetch_failed"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self { ApiError::Search(e) }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{e:#}"), "request failed");
        ApiError::Internal("internal error".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.parts();
        let detail = match self {
            ApiError::Search(e) => e.to_string(),
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::FetchFailed(msg)
            | ApiError::Internal(msg) => msg,
        };
        if status.is_client_error() {
            tracing::warn!(%status, kind, %detail, "request rejected");
        }
        (status, Json(json!({ "kind": kind, "detail": detail }))).into_response()
    }
}
