use encore_core::model::{Lesson, LessonId};

use super::{
    SqliteRepository,
    mapping::{map_lesson_row, tiers_to_json},
};
use crate::repository::{LessonRepository, StorageError};

const LESSON_COLUMNS: &str = r"
    id, title, description, artist, topic, difficulty, published,
    tiers, created_at, updated_at
";

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (
                id, title, description, artist, topic, difficulty, published,
                tiers, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                title = excluded.title,
                description = excluded.description,
                artist = excluded.artist,
                topic = excluded.topic,
                difficulty = excluded.difficulty,
                published = excluded.published,
                tiers = excluded.tiers,
                updated_at = excluded.updated_at
            ",
        )
        .bind(lesson.id().to_string())
        .bind(lesson.title().to_owned())
        .bind(lesson.description().map(str::to_owned))
        .bind(lesson.artist().to_owned())
        .bind(lesson.topic().to_owned())
        .bind(i64::from(lesson.difficulty().value()))
        .bind(lesson.is_published())
        .bind(tiers_to_json(lesson.tiers())?)
        .bind(lesson.created_at())
        .bind(lesson.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_lesson_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_lessons(&self, published_only: bool) -> Result<Vec<Lesson>, StorageError> {
        let filter = if published_only {
            "WHERE published = 1"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM lessons {filter} ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
