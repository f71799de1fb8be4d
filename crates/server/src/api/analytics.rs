//! Aggregate statistics endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use encore_core::model::{LearnerId, LessonId};
use serde::Serialize;
use services::LessonStats;

use super::error::ApiError;
use super::ids::{learner_id, parse_lesson_id};
use crate::AppState;

/// Per-lesson aggregate over every learner's progress rows.
///
/// `avg_attempts` counts persistence calls, one per check or advance action,
/// not distinct sessions.
#[derive(Debug, Serialize)]
pub struct LessonStatsResponse {
    pub lesson_id: LessonId,
    pub learners: u32,
    pub completed: u32,
    pub completion_rate: f64,
    pub avg_score: f64,
    pub avg_xp: f64,
    pub avg_attempts: f64,
    pub avg_time_spent: f64,
}

impl From<LessonStats> for LessonStatsResponse {
    fn from(stats: LessonStats) -> Self {
        Self {
            lesson_id: stats.lesson_id,
            learners: stats.learners,
            completed: stats.completed,
            completion_rate: stats.completion_rate,
            avg_score: stats.avg_score,
            avg_xp: stats.avg_xp,
            avg_attempts: stats.avg_attempts,
            avg_time_spent: stats.avg_time_spent_secs,
        }
    }
}

/// One learner's standing across lessons, with their scores rescaled to a
/// 0 to 100 chart series.
#[derive(Debug, Serialize)]
pub struct LearnerOverviewResponse {
    pub learner_id: LearnerId,
    pub total_xp: u32,
    pub lessons_completed: u32,
    pub lessons_in_progress: u32,
    pub score_series: Vec<f64>,
}

/// GET /api/analytics/lessons/:id
pub async fn lesson_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LessonStatsResponse>, ApiError> {
    let id = parse_lesson_id(&id)?;
    let stats = state.analytics.lesson_stats(id).await?;
    Ok(Json(LessonStatsResponse::from(stats)))
}

/// GET /api/analytics/learner
pub async fn learner_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LearnerOverviewResponse>, ApiError> {
    let learner = learner_id(&headers)?;
    let overview = state.analytics.learner_overview(learner).await?;
    let score_series = state.analytics.learner_score_series(learner).await?;
    Ok(Json(LearnerOverviewResponse {
        learner_id: overview.learner_id,
        total_xp: overview.total_xp,
        lessons_completed: overview.lessons_completed,
        lessons_in_progress: overview.lessons_in_progress,
        score_series,
    }))
}
