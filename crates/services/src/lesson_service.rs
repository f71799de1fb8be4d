use std::sync::Arc;

use encore_core::model::{Lesson, LessonDraft, LessonId};
use storage::repository::LessonRepository;

use crate::Clock;
use crate::error::LessonServiceError;

/// Orchestrates lesson authoring and persistence.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(clock: Clock, lessons: Arc<dyn LessonRepository>) -> Self {
        Self { clock, lessons }
    }

    /// Validate a draft into a new lesson and persist it.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Lesson` for validation failures.
    /// Returns `LessonServiceError::Storage` if persistence fails.
    pub async fn create_lesson(&self, draft: LessonDraft) -> Result<LessonId, LessonServiceError> {
        let now = self.clock.now();
        let id = LessonId::new();
        let lesson = draft.validate(id, now, now)?;
        self.lessons.upsert_lesson(&lesson).await?;
        Ok(id)
    }

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` with `NotFound` if the lesson
    /// does not exist.
    pub async fn get_lesson(&self, id: LessonId) -> Result<Lesson, LessonServiceError> {
        let lesson = self.lessons.get_lesson(id).await?;
        Ok(lesson)
    }

    /// List lessons, newest first. With `published_only`, drafts are skipped.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if repository access fails.
    pub async fn list_lessons(
        &self,
        published_only: bool,
    ) -> Result<Vec<Lesson>, LessonServiceError> {
        let lessons = self.lessons.list_lessons(published_only).await?;
        Ok(lessons)
    }

    /// Replace a lesson's content and metadata, keeping its identity and
    /// creation time.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Lesson` for validation failures.
    /// Returns `LessonServiceError::Storage` if the lesson does not exist or
    /// persistence fails.
    pub async fn update_lesson(
        &self,
        id: LessonId,
        draft: LessonDraft,
    ) -> Result<(), LessonServiceError> {
        let existing = self.lessons.get_lesson(id).await?;
        let now = self.clock.now();
        let updated = draft.validate(id, existing.created_at(), now)?;
        self.lessons.upsert_lesson(&updated).await?;
        Ok(())
    }

    /// Publish or unpublish a lesson while preserving its content.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the lesson does not exist or
    /// persistence fails.
    pub async fn set_published(
        &self,
        id: LessonId,
        published: bool,
    ) -> Result<(), LessonServiceError> {
        let lesson = self.lessons.get_lesson(id).await?;
        let draft = LessonDraft {
            title: lesson.title().to_owned(),
            description: lesson.description().map(str::to_owned),
            artist: lesson.artist().to_owned(),
            topic: lesson.topic().to_owned(),
            difficulty: lesson.difficulty().value(),
            published,
            tiers: lesson.tiers().clone(),
        };
        self.update_lesson(id, draft).await
    }

    /// Delete a lesson and every learner's progress in it.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` with `NotFound` if the lesson
    /// does not exist.
    pub async fn delete_lesson(&self, id: LessonId) -> Result<(), LessonServiceError> {
        self.lessons.delete_lesson(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use encore_core::model::{
        ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, LessonError, MultipleChoiceTier,
        StepsTier, TierSet,
    };
    use encore_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    fn sample_tiers() -> TierSet {
        TierSet::new(
            IntroTier::new("Counting beats", "Four beats to a bar.", None).unwrap(),
            StepsTier::new(vec!["Write the equation.".into()]).unwrap(),
            MultipleChoiceTier::new(
                "2 + 2?",
                vec![
                    ChoiceOption::new("a", "4", true),
                    ChoiceOption::new("b", "5", false),
                ],
                10,
            )
            .unwrap(),
            FillInBlankTier::new("How many members?", "eight", vec![], 15).unwrap(),
            CompletionTier::new("Encore!", 25, None, None).unwrap(),
        )
    }

    fn sample_draft(title: &str, published: bool) -> LessonDraft {
        LessonDraft {
            title: title.into(),
            description: None,
            artist: "NewJeans".into(),
            topic: "linear-equations".into(),
            difficulty: 2,
            published,
            tiers: sample_tiers(),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = LessonService::new(Clock::Fixed(fixed_now()), repo);

        let id = service
            .create_lesson(sample_draft("First lesson", true))
            .await
            .unwrap();
        let lesson = service.get_lesson(id).await.unwrap();
        assert_eq!(lesson.title(), "First lesson");
        assert_eq!(lesson.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = LessonService::new(Clock::Fixed(fixed_now()), repo);

        let err = service
            .create_lesson(sample_draft("   ", true))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LessonServiceError::Lesson(LessonError::EmptyTitle)
        ));
    }

    #[tokio::test]
    async fn update_keeps_created_at() {
        let repo = Arc::new(InMemoryRepository::new());
        let created_at = fixed_now();
        let service = LessonService::new(Clock::Fixed(created_at), repo.clone());
        let id = service
            .create_lesson(sample_draft("Original", true))
            .await
            .unwrap();

        let later = created_at + Duration::minutes(10);
        let editor = LessonService::new(Clock::Fixed(later), repo);
        editor
            .update_lesson(id, sample_draft("Edited", true))
            .await
            .unwrap();

        let lesson = editor.get_lesson(id).await.unwrap();
        assert_eq!(lesson.title(), "Edited");
        assert_eq!(lesson.created_at(), created_at);
        assert_eq!(lesson.updated_at(), later);
    }

    #[tokio::test]
    async fn set_published_flips_only_the_flag() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = LessonService::new(Clock::Fixed(fixed_now()), repo);
        let id = service
            .create_lesson(sample_draft("Draft lesson", false))
            .await
            .unwrap();

        service.set_published(id, true).await.unwrap();
        let lesson = service.get_lesson(id).await.unwrap();
        assert!(lesson.is_published());
        assert_eq!(lesson.title(), "Draft lesson");

        let published = service.list_lessons(true).await.unwrap();
        assert_eq!(published.len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = LessonService::new(Clock::Fixed(fixed_now()), repo);

        let err = service.delete_lesson(LessonId::new()).await.unwrap_err();
        assert!(matches!(
            err,
            LessonServiceError::Storage(StorageError::NotFound)
        ));
    }
}
