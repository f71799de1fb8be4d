//! Progress fetch and save endpoints.
//!
//! The learner's app runs the lesson state machine locally and posts whole
//! snapshots; the server derives the completed set from the snapshot, stamps
//! attempts and timestamps against the stored row, and writes the result.
//! Last write wins across rapid saves.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use encore_core::model::{
    CompletedTiers, LearnerId, LessonId, LessonProgress, ProgressStatus, Tier,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::ids::{learner_id, parse_lesson_id};
use crate::AppState;

/// Body of `POST /api/progress`: the fields the learner's app tracks.
///
/// `attempts`, `started_at`, and `completed_at` are server-owned and not
/// accepted from the wire.
#[derive(Debug, Deserialize)]
pub struct SaveProgressBody {
    pub lesson_id: LessonId,
    pub current_tier: u8,
    pub score: u32,
    pub xp_earned: u32,
    pub status: String,
    #[serde(default)]
    pub time_spent: u32,
}

/// A stored progress row, server stamps included.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub current_tier: u8,
    pub completed_tiers: Vec<u8>,
    pub score: u32,
    pub xp_earned: u32,
    pub status: &'static str,
    pub attempts: u32,
    pub time_spent: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&LessonProgress> for ProgressResponse {
    fn from(progress: &LessonProgress) -> Self {
        Self {
            learner_id: progress.learner_id(),
            lesson_id: progress.lesson_id(),
            current_tier: progress.current_tier().number(),
            completed_tiers: progress.completed().iter().map(Tier::number).collect(),
            score: progress.score(),
            xp_earned: progress.xp_earned(),
            status: progress.status().as_str(),
            attempts: progress.attempts(),
            time_spent: progress.time_spent_secs(),
            started_at: progress.started_at(),
            completed_at: progress.completed_at(),
        }
    }
}

/// GET /api/progress/:lesson_id
pub async fn get_progress(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ProgressResponse>, ApiError> {
    let learner = learner_id(&headers)?;
    let lesson_id = parse_lesson_id(&lesson_id)?;
    let progress = state
        .progress
        .load(learner, lesson_id)
        .await?
        .ok_or(ApiError::NotFound("progress"))?;
    Ok(Json(ProgressResponse::from(&progress)))
}

/// POST /api/progress
///
/// Saves against an unknown lesson are rejected with 404 before anything is
/// written.
pub async fn save_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SaveProgressBody>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let learner = learner_id(&headers)?;
    let snapshot = snapshot_from_body(learner, &body)?;
    state.lessons.get_lesson(body.lesson_id).await?;
    let stored = state.progress.save(&snapshot).await?;
    Ok(Json(ProgressResponse::from(&stored)))
}

/// Rebuild a domain snapshot from the wire fields.
///
/// The completed set is everything below the current tier, plus the
/// completion tier once the run is completed; a learner who jumped back keeps
/// the completion bit through the status.
fn snapshot_from_body(
    learner: LearnerId,
    body: &SaveProgressBody,
) -> Result<LessonProgress, ApiError> {
    let current = Tier::from_u8(body.current_tier)?;
    let status: ProgressStatus = body.status.parse()?;

    let mut completed = CompletedTiers::empty();
    for tier in Tier::ALL {
        if tier.number() < current.number() {
            completed.insert(tier);
        }
    }
    if status == ProgressStatus::Completed {
        completed.insert(Tier::Completion);
    }

    // Attempts and timestamps are zeroed here; save() stamps them from the
    // stored row.
    let snapshot = LessonProgress::from_persisted(
        learner,
        body.lesson_id,
        body.current_tier,
        completed.bits(),
        body.score,
        body.xp_earned,
        status,
        0,
        body.time_spent,
        None,
        None,
    )?;
    Ok(snapshot)
}
