use encore_core::model::{LearnerId, LessonId, LessonProgress};

use super::{SqliteRepository, mapping::map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    learner_id, lesson_id, current_tier, completed_tiers, score, xp_earned,
    status, attempts, time_spent_secs, started_at, completed_at
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (
                learner_id, lesson_id, current_tier, completed_tiers, score,
                xp_earned, status, attempts, time_spent_secs, started_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(learner_id, lesson_id) DO UPDATE SET
                current_tier = excluded.current_tier,
                completed_tiers = excluded.completed_tiers,
                score = excluded.score,
                xp_earned = excluded.xp_earned,
                status = excluded.status,
                attempts = excluded.attempts,
                time_spent_secs = excluded.time_spent_secs,
                -- started_at and completed_at keep their first recorded value
                started_at = COALESCE(lesson_progress.started_at, excluded.started_at),
                completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at)
            ",
        )
        .bind(progress.learner_id().to_string())
        .bind(progress.lesson_id().to_string())
        .bind(i64::from(progress.current_tier().number()))
        .bind(i64::from(progress.completed().bits()))
        .bind(i64::from(progress.score()))
        .bind(i64::from(progress.xp_earned()))
        .bind(progress.status().as_str())
        .bind(i64::from(progress.attempts()))
        .bind(i64::from(progress.time_spent_secs()))
        .bind(progress.started_at())
        .bind(progress.completed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress \
             WHERE learner_id = ?1 AND lesson_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(learner_id.to_string())
            .bind(lesson_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress \
             WHERE lesson_id = ?1 ORDER BY learner_id"
        );
        let rows = sqlx::query(&sql)
            .bind(lesson_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn list_progress_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress \
             WHERE learner_id = ?1 ORDER BY lesson_id"
        );
        let rows = sqlx::query(&sql)
            .bind(learner_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }
}
