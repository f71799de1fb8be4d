//! Error mapping from domain and service failures to HTTP responses.
//!
//! One status per failure category: bad input 400, missing resource 404,
//! exhausted quota 429, no upstream configured 503, upstream misbehaving 502,
//! storage broken 500. Every response body is `{"error": "..."}`.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use encore_core::model::{LessonError, ProgressError, TierError};
use serde_json::json;
use services::{
    AnalyticsError, GenerationError, LessonServiceError, RateLimitError, SessionError,
};
use storage::repository::StorageError;
use tracing::warn;

/// Error surfaced to HTTP clients, tagged with the status it maps to.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed ids, bad payload fields, or failed domain validation.
    Validation(String),
    /// The addressed resource does not exist; carries its kind for the body.
    NotFound(&'static str),
    /// The caller exhausted the request window.
    RateLimited { retry_after_secs: u32 },
    /// Question generation has no API key on this deployment.
    GenerationDisabled,
    /// The generation upstream failed or returned garbage.
    Upstream(String),
    /// Storage failed underneath an otherwise valid request.
    Storage(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::GenerationDisabled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::RateLimited { retry_after_secs } => {
                format!("rate limit exceeded, retry in {retry_after_secs}s")
            }
            ApiError::GenerationDisabled => "question generation is not configured".to_owned(),
            ApiError::Upstream(msg) => format!("question generation failed: {msg}"),
            ApiError::Storage(msg) => format!("storage error: {msg}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        // Clients get the category; the log keeps the detail.
        if status.is_server_error() {
            warn!("Request failed with {}: {}", status, message);
        }

        let body = Json(json!({ "error": message }));
        match self {
            ApiError::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// `NotFound` keeps its 404 identity; other storage failures become 500s.
fn from_storage(what: &'static str, err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound => ApiError::NotFound(what),
        other => ApiError::Storage(other.to_string()),
    }
}

impl From<LessonServiceError> for ApiError {
    fn from(err: LessonServiceError) -> Self {
        match err {
            LessonServiceError::Lesson(e) => ApiError::Validation(e.to_string()),
            LessonServiceError::Storage(e) => from_storage("lesson", e),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Storage(e) => from_storage("progress", e),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::Storage(e) => ApiError::Storage(e.to_string()),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Storage(e) => ApiError::Storage(e.to_string()),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Disabled => ApiError::GenerationDisabled,
            GenerationError::UnsupportedTier(tier) => {
                ApiError::Validation(format!("tier {tier} has no generated questions"))
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<LessonError> for ApiError {
    fn from(err: LessonError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<TierError> for ApiError {
    fn from(err: TierError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        ApiError::Validation(err.to_string())
    }
}
