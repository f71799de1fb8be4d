use async_trait::async_trait;
use encore_core::model::{LearnerId, Lesson, LessonId, LessonProgress};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for authored lessons.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError>;

    /// List lessons, newest first. With `published_only`, drafts are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing cannot be read.
    async fn list_lessons(&self, published_only: bool) -> Result<Vec<Lesson>, StorageError>;

    /// Delete a lesson and, with it, every learner's progress in it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;
}

/// Repository contract for per-learner lesson progress.
///
/// Progress rows are keyed by `(learner, lesson)`; a missing row simply means
/// the learner has not saved anything yet, so fetches return `Option` rather
/// than treating absence as an error.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist or update a progress snapshot.
    ///
    /// `started_at` and `completed_at` keep the value from the first write
    /// that set them, so replays cannot move either stamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;

    /// Fetch one learner's progress in one lesson, if any was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for transport or decoding failures.
    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// All progress rows for a lesson, for aggregate statistics.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for transport or decoding failures.
    async fn list_progress_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// All progress rows for a learner, across lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for transport or decoding failures.
    async fn list_progress_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonProgress>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, LessonId), LessonProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lessons: Arc::new(Mutex::new(HashMap::new())),
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_lessons(&self, published_only: bool) -> Result<Vec<Lesson>, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut lessons: Vec<Lesson> = guard
            .values()
            .filter(|l| !published_only || l.is_published())
            .cloned()
            .collect();
        lessons.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(lessons)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        drop(guard);

        let mut progress = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        progress.retain(|(_, lesson_id), _| *lesson_id != id);
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (progress.learner_id(), progress.lesson_id());
        let merged = match guard.get(&key) {
            None => progress.clone(),
            Some(existing) => merge_first_stamps(progress, existing)?,
        };
        guard.insert(key, merged);
        Ok(())
    }

    async fn get_progress(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(learner_id, lesson_id)).cloned())
    }

    async fn list_progress_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|p| p.lesson_id() == lesson_id)
            .cloned()
            .collect())
    }

    async fn list_progress_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|p| p.learner_id() == learner_id)
            .cloned()
            .collect())
    }
}

/// Applies the first-write-wins rule for `started_at` and `completed_at`.
fn merge_first_stamps(
    incoming: &LessonProgress,
    existing: &LessonProgress,
) -> Result<LessonProgress, StorageError> {
    LessonProgress::from_persisted(
        incoming.learner_id(),
        incoming.lesson_id(),
        incoming.current_tier().number(),
        incoming.completed().bits(),
        incoming.score(),
        incoming.xp_earned(),
        incoming.status(),
        incoming.attempts(),
        incoming.time_spent_secs(),
        existing.started_at().or(incoming.started_at()),
        existing.completed_at().or(incoming.completed_at()),
    )
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Aggregates lesson and progress repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { lessons, progress }
    }
}
