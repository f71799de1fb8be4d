//! Identifier plumbing shared by the handlers.
//!
//! Learner identity is minted by an external provider and arrives as an
//! opaque UUID in the `x-learner-id` header; the server carries it through
//! without checking any credential behind it.

use axum::http::HeaderMap;
use encore_core::model::{LearnerId, LessonId};

use super::error::ApiError;

/// Header carrying the caller's learner id.
pub const LEARNER_ID_HEADER: &str = "x-learner-id";

/// Read the learner id off the request headers.
///
/// # Errors
///
/// Returns `ApiError::Validation` when the header is missing or not a UUID.
pub fn learner_id(headers: &HeaderMap) -> Result<LearnerId, ApiError> {
    let raw = headers
        .get(LEARNER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Validation(format!("missing {LEARNER_ID_HEADER} header")))?;
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid {LEARNER_ID_HEADER} header: {raw}")))
}

/// Parse a lesson id out of a path segment.
///
/// # Errors
///
/// Returns `ApiError::Validation` when the segment is not a UUID.
pub fn parse_lesson_id(raw: &str) -> Result<LessonId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid lesson id: {raw}")))
}
