use encore_core::model::{
    LearnerId, Lesson, LessonId, LessonProgress, ProgressStatus, TierContent, TierSet,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn lesson_id_from_str(s: &str) -> Result<LessonId, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn learner_id_from_str(s: &str) -> Result<LearnerId, StorageError> {
    s.parse().map_err(ser)
}

/// Serializes a lesson's tier contents for the `lessons.tiers` column.
///
/// The column holds the five tiers as a JSON array of tagged objects, in
/// lesson order.
pub(crate) fn tiers_to_json(tiers: &TierSet) -> Result<String, StorageError> {
    serde_json::to_string(&tiers.contents()).map_err(ser)
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    let tiers_json: String = row.try_get("tiers").map_err(ser)?;
    let contents: Vec<TierContent> = serde_json::from_str(&tiers_json).map_err(ser)?;

    Lesson::from_persisted(
        lesson_id_from_str(row.try_get::<String, _>("id").map_err(ser)?.as_str())?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        row.try_get("artist").map_err(ser)?,
        row.try_get("topic").map_err(ser)?,
        i64_to_u8("difficulty", row.try_get::<i64, _>("difficulty").map_err(ser)?)?,
        row.try_get("published").map_err(ser)?,
        contents,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LessonProgress, StorageError> {
    let status: ProgressStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    LessonProgress::from_persisted(
        learner_id_from_str(row.try_get::<String, _>("learner_id").map_err(ser)?.as_str())?,
        lesson_id_from_str(row.try_get::<String, _>("lesson_id").map_err(ser)?.as_str())?,
        i64_to_u8(
            "current_tier",
            row.try_get::<i64, _>("current_tier").map_err(ser)?,
        )?,
        i64_to_u8(
            "completed_tiers",
            row.try_get::<i64, _>("completed_tiers").map_err(ser)?,
        )?,
        i64_to_u32("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        i64_to_u32("xp_earned", row.try_get::<i64, _>("xp_earned").map_err(ser)?)?,
        status,
        i64_to_u32("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        i64_to_u32(
            "time_spent_secs",
            row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
        )?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}
