//! API error types and HTTP response conversion.
//!
//! Wraps [`CoreError`] with the HTTP status mapping from the external
//! interface contract; handlers propagate `CoreError` with `?` and this
//! conversion takes care of the rest.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::error::DatabaseError;
use crate::CoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Thin wrapper so [`CoreError`] can implement [`IntoResponse`] without the
/// core crate depending on axum.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match &self.0 {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::NotFound(_) => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::RenderFailed(_) => "render_failed",
            CoreError::TranscribeFailed(_) => "transcribe_failed",
            CoreError::IngestFailed(_) => "ingest_failed",
            CoreError::ProviderUnavailable(_) => "provider_unavailable",
            CoreError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::RenderFailed(_)
            | CoreError::TranscribeFailed(_)
            | CoreError::IngestFailed(_)
            | CoreError::ProviderUnavailable(_)
            | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError(CoreError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiErrorBody { error: self.kind(), message: self.0.to_string() };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %body.message, kind = body.error, "request failed");
        }
        (status, Json(body)).into_response()
    }
}
