use std::sync::Arc;

use encore_core::model::{LearnerId, LessonId, LessonProgress, ProgressStatus};
use storage::repository::ProgressRepository;

use crate::error::AnalyticsError;

//
// ─── AGGREGATES ────────────────────────────────────────────────────────────────
//

/// Aggregate numbers for one lesson across every learner who saved progress.
///
/// Presentation-agnostic: plain counts and means, no formatting. `attempts`
/// counts persistence actions (answer checks and tier changes), not sittings.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonStats {
    pub lesson_id: LessonId,
    pub learners: u32,
    pub completed: u32,
    pub completion_rate: f64,
    pub avg_score: f64,
    pub avg_xp: f64,
    pub avg_attempts: f64,
    pub avg_time_spent_secs: f64,
}

impl LessonStats {
    /// Folds progress rows into per-lesson means. No rows means all zeros.
    #[must_use]
    pub fn from_rows(lesson_id: LessonId, rows: &[LessonProgress]) -> Self {
        let learners = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        if learners == 0 {
            return Self {
                lesson_id,
                learners: 0,
                completed: 0,
                completion_rate: 0.0,
                avg_score: 0.0,
                avg_xp: 0.0,
                avg_attempts: 0.0,
                avg_time_spent_secs: 0.0,
            };
        }

        let completed = u32::try_from(rows.iter().filter(|p| p.is_completed()).count())
            .unwrap_or(u32::MAX);
        let count = f64::from(learners);
        let sum_of = |pick: fn(&LessonProgress) -> u32| {
            rows.iter().map(|p| f64::from(pick(p))).sum::<f64>()
        };

        Self {
            lesson_id,
            learners,
            completed,
            completion_rate: f64::from(completed) / count,
            avg_score: sum_of(LessonProgress::score) / count,
            avg_xp: sum_of(LessonProgress::xp_earned) / count,
            avg_attempts: sum_of(LessonProgress::attempts) / count,
            avg_time_spent_secs: sum_of(LessonProgress::time_spent_secs) / count,
        }
    }
}

/// One learner's totals across every lesson they touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerOverview {
    pub learner_id: LearnerId,
    pub total_xp: u32,
    pub lessons_completed: u32,
    pub lessons_in_progress: u32,
}

impl LearnerOverview {
    #[must_use]
    pub fn from_rows(learner_id: LearnerId, rows: &[LessonProgress]) -> Self {
        let mut total_xp: u32 = 0;
        let mut lessons_completed = 0;
        let mut lessons_in_progress = 0;
        for row in rows {
            total_xp = total_xp.saturating_add(row.xp_earned());
            match row.status() {
                ProgressStatus::Completed => lessons_completed += 1,
                ProgressStatus::InProgress => lessons_in_progress += 1,
                ProgressStatus::NotStarted => {}
            }
        }
        Self {
            learner_id,
            total_xp,
            lessons_completed,
            lessons_in_progress,
        }
    }
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

/// Rescales a series onto a 0 to 100 chart axis using its own min and max.
///
/// An empty series stays empty. A flat series maps every point to the
/// midpoint, 50, so a chart still has a line to draw.
#[must_use]
pub fn normalize_series(values: &[f64]) -> Vec<f64> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    let (min, max) = values
        .iter()
        .fold((*first, *first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;

    values
        .iter()
        .map(|v| {
            if span == 0.0 {
                50.0
            } else {
                (v - min) / span * 100.0
            }
        })
        .collect()
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only statistics over stored progress rows.
///
/// Everything here is plain arithmetic over the rows a repository hands back;
/// nothing is cached or precomputed.
#[derive(Clone)]
pub struct AnalyticsService {
    progress: Arc<dyn ProgressRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// Aggregate stats for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` on repository failures.
    pub async fn lesson_stats(&self, lesson_id: LessonId) -> Result<LessonStats, AnalyticsError> {
        let rows = self.progress.list_progress_for_lesson(lesson_id).await?;
        Ok(LessonStats::from_rows(lesson_id, &rows))
    }

    /// Totals for one learner across lessons.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` on repository failures.
    pub async fn learner_overview(
        &self,
        learner_id: LearnerId,
    ) -> Result<LearnerOverview, AnalyticsError> {
        let rows = self.progress.list_progress_for_learner(learner_id).await?;
        Ok(LearnerOverview::from_rows(learner_id, &rows))
    }

    /// The learner's per-lesson scores rescaled to a 0 to 100 chart series,
    /// in the repository's lesson order.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` on repository failures.
    pub async fn learner_score_series(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<f64>, AnalyticsError> {
        let rows = self.progress.list_progress_for_learner(learner_id).await?;
        let scores: Vec<f64> = rows.iter().map(|p| f64::from(p.score())).collect();
        Ok(normalize_series(&scores))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
