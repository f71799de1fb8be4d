//! Question generation endpoint, rate limited per learner.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use encore_core::model::{Difficulty, Tier};
use serde::Deserialize;
use services::{GeneratedQuestion, QuestionRequest, RateLimitDecision};

use super::error::ApiError;
use super::ids::learner_id;
use crate::AppState;

/// Body of `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub topic: String,
    pub difficulty: u8,
    pub artist_name: String,
    pub tier: u8,
}

/// POST /api/generate
///
/// The caller's window is counted before validation; malformed payloads
/// still spend quota.
pub async fn generate_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GeneratedQuestion>, ApiError> {
    let learner = learner_id(&headers)?;

    let decision = state.rate_limiter.check(&learner.to_string()).await?;
    if let RateLimitDecision::Limited { retry_after_secs } = decision {
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    let request = QuestionRequest {
        topic: body.topic,
        difficulty: Difficulty::new(body.difficulty)?,
        artist_name: body.artist_name,
        tier: Tier::from_u8(body.tier)?,
    };
    let generated = state.question_gen.generate_question(&request).await?;
    Ok(Json(generated))
}
