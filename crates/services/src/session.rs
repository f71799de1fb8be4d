use std::sync::Arc;

use tracing::warn;

use encore_core::model::{LearnerId, Lesson, LessonId, LessonProgress, Tier, TierContent};
use encore_core::{Evaluation, TierProgression};
use storage::repository::LessonRepository;

use crate::error::SessionError;
use crate::progress_service::ProgressService;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's live run through one lesson.
///
/// Holds the lesson content and the progression machine. The machine is the
/// in-session source of truth; attempts and timestamps belong to storage and
/// are stamped on each save. When a save fails the session keeps running on
/// its in-memory state and `has_unsaved_changes` reports the gap.
#[derive(Debug, Clone)]
pub struct LessonSession {
    lesson: Lesson,
    progression: TierProgression,
    unsaved: bool,
}

impl LessonSession {
    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn progress(&self) -> &LessonProgress {
        self.progression.progress()
    }

    #[must_use]
    pub fn current_tier(&self) -> Tier {
        self.progression.current_tier()
    }

    #[must_use]
    pub fn current_content(&self) -> TierContent {
        self.progression.current_content()
    }

    #[must_use]
    pub fn show_feedback(&self) -> bool {
        self.progression.show_feedback()
    }

    #[must_use]
    pub fn is_answer_correct(&self) -> bool {
        self.progression.is_answer_correct()
    }

    #[must_use]
    pub fn max_unlocked(&self) -> Tier {
        self.progression.max_unlocked()
    }

    #[must_use]
    pub fn can_complete_current(&self) -> bool {
        self.progression.can_complete_current()
    }

    /// Whether the latest state reached storage.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Adds wall-clock seconds to the lesson timer.
    ///
    /// Not persisted on its own; the accumulated total rides along with the
    /// next answer check or tier transition.
    pub fn record_time_spent(&mut self, secs: u32) {
        self.progression.record_time_spent(secs);
    }
}

//
// ─── SESSION SERVICE ───────────────────────────────────────────────────────────
//

/// Orchestrates lesson sessions and their persistence.
///
/// Every answer check and tier transition that changes state is saved through
/// the progress service. A failed save is logged and swallowed so the learner
/// keeps working; the session's unsaved flag carries the degradation.
#[derive(Clone)]
pub struct LessonSessionService {
    lessons: Arc<dyn LessonRepository>,
    progress: ProgressService,
}

impl LessonSessionService {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>, progress: ProgressService) -> Self {
        Self { lessons, progress }
    }

    /// Opens a session, resuming stored progress when there is any.
    ///
    /// Opening alone saves nothing; the attempt counter moves only when the
    /// learner checks an answer or changes tier.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the lesson or the stored progress
    /// cannot be read.
    pub async fn start_session(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<LessonSession, SessionError> {
        let lesson = self.lessons.get_lesson(lesson_id).await?;
        let stored = self.progress.load(learner_id, lesson_id).await?;

        let tiers = lesson.tiers().clone();
        let progression = match stored {
            Some(snapshot) => TierProgression::resume(tiers, snapshot),
            None => TierProgression::start(tiers, learner_id, lesson_id),
        };

        Ok(LessonSession {
            lesson,
            progression,
            unsaved: false,
        })
    }

    /// Checks a submitted answer against the current tier and saves.
    ///
    /// A repeat check after a correct verdict returns the cached result
    /// without saving, so holding the button does not inflate the attempt
    /// count. Checks on non-question tiers change nothing and skip the save.
    pub async fn check_answer(
        &self,
        session: &mut LessonSession,
        submission: &str,
    ) -> Evaluation {
        let tier = session.progression.current_tier();
        let repeat = session.progression.is_answer_correct();
        let evaluation = session.progression.check_answer(submission);
        if tier.is_question() && !repeat {
            self.persist(session).await;
        }
        evaluation
    }

    /// Completes the current tier and saves when the state moved.
    pub async fn complete_tier(&self, session: &mut LessonSession) -> bool {
        let changed = session.progression.complete_tier();
        if changed {
            self.persist(session).await;
        }
        changed
    }

    /// Steps back one tier and saves when the state moved.
    pub async fn go_to_previous(&self, session: &mut LessonSession) -> bool {
        let changed = session.progression.go_to_previous();
        if changed {
            self.persist(session).await;
        }
        changed
    }

    /// Jumps to an unlocked tier and saves when the state moved.
    pub async fn jump_to(&self, session: &mut LessonSession, target: Tier) -> bool {
        let changed = session.progression.jump_to(target);
        if changed {
            self.persist(session).await;
        }
        changed
    }

    async fn persist(&self, session: &mut LessonSession) {
        match self.progress.save(session.progression.progress()).await {
            Ok(_) => session.unsaved = false,
            Err(e) => {
                warn!("Failed to save lesson progress: {}", e);
                session.unsaved = true;
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    use encore_core::Clock;
    use encore_core::model::{
        ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, LessonDraft, MultipleChoiceTier,
        ProgressStatus, StepsTier, TierSet,
    };
    use encore_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ProgressRepository, StorageError};

    fn sample_tiers() -> TierSet {
        TierSet::new(
            IntroTier::new("Counting beats", "Four beats to a bar.", None).unwrap(),
            StepsTier::new(vec!["Write the equation.".into(), "Solve for x.".into()]).unwrap(),
            MultipleChoiceTier::new(
                "2 + 2?",
                vec![
                    ChoiceOption::new("a", "4", true),
                    ChoiceOption::new("b", "5", false),
                ],
                10,
            )
            .unwrap(),
            FillInBlankTier::new("Plural of cat?", "cat", vec!["cats".into()], 15).unwrap(),
            CompletionTier::new("Encore!", 5, None, None).unwrap(),
        )
    }

    async fn seeded_lesson(repo: &InMemoryRepository) -> Lesson {
        let lesson = LessonDraft {
            title: "Linear equations with NewJeans".into(),
            description: None,
            artist: "NewJeans".into(),
            topic: "linear-equations".into(),
            difficulty: 2,
            published: true,
            tiers: sample_tiers(),
        }
        .validate(LessonId::new(), fixed_now(), fixed_now())
        .unwrap();
        repo.upsert_lesson(&lesson).await.unwrap();
        lesson
    }

    fn service_over(repo: &Arc<InMemoryRepository>) -> LessonSessionService {
        let progress = ProgressService::new(Clock::Fixed(fixed_now()), repo.clone());
        LessonSessionService::new(repo.clone(), progress)
    }

    #[tokio::test]
    async fn start_opens_fresh_without_saving() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let session = service.start_session(learner, lesson.id()).await.unwrap();
        assert_eq!(session.current_tier(), Tier::Intro);
        assert_eq!(session.progress().status(), ProgressStatus::NotStarted);
        assert!(!session.has_unsaved_changes());

        let stored = repo.get_progress(learner, lesson.id()).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn start_fails_for_missing_lesson() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = service_over(&repo);

        let err = service
            .start_session(LearnerId::new(), LessonId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Storage(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn start_resumes_saved_position() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        assert!(service.complete_tier(&mut session).await);
        drop(session);

        let resumed = service.start_session(learner, lesson.id()).await.unwrap();
        assert_eq!(resumed.current_tier(), Tier::Steps);
        assert!(resumed.progress().completed().contains(Tier::Intro));
        assert_eq!(resumed.progress().status(), ProgressStatus::InProgress);
    }

    #[tokio::test]
    async fn wrong_answer_saves_but_does_not_advance() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        assert!(service.complete_tier(&mut session).await);
        assert!(service.complete_tier(&mut session).await);
        assert_eq!(session.current_tier(), Tier::MultipleChoice);

        let wrong = service.check_answer(&mut session, "b").await;
        assert!(!wrong.correct);
        assert!(!service.complete_tier(&mut session).await);
        assert_eq!(session.current_tier(), Tier::MultipleChoice);

        let stored = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts(), 3);
        assert_eq!(stored.score(), 0);
        assert_eq!(stored.xp_earned(), 0);
        assert_eq!(stored.current_tier(), Tier::MultipleChoice);
    }

    #[tokio::test]
    async fn correct_answer_banks_score_and_advances() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        service.complete_tier(&mut session).await;
        service.complete_tier(&mut session).await;

        let right = service.check_answer(&mut session, "a").await;
        assert!(right.correct);
        assert_eq!(right.reward_xp, 10);
        assert!(service.complete_tier(&mut session).await);
        assert_eq!(session.current_tier(), Tier::FillInBlank);

        let stored = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.score(), 20);
        assert_eq!(stored.xp_earned(), 10);
        assert_eq!(stored.attempts(), 4);
        assert_eq!(stored.current_tier(), Tier::FillInBlank);
    }

    #[tokio::test]
    async fn repeat_check_after_correct_does_not_save_again() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        service.complete_tier(&mut session).await;
        service.complete_tier(&mut session).await;
        service.check_answer(&mut session, "a").await;

        let attempts_before = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap()
            .attempts();

        let again = service.check_answer(&mut session, "a").await;
        assert!(again.correct);

        let attempts_after = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap()
            .attempts();
        assert_eq!(attempts_after, attempts_before);
    }

    #[tokio::test]
    async fn check_on_intro_neither_awards_nor_saves() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        let result = service.check_answer(&mut session, "anything").await;
        assert!(!result.correct);

        let stored = repo.get_progress(learner, lesson.id()).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn finishing_saves_bonus_once() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        service.complete_tier(&mut session).await;
        service.complete_tier(&mut session).await;
        service.check_answer(&mut session, "a").await;
        service.complete_tier(&mut session).await;
        service.check_answer(&mut session, " CATS ").await;
        service.complete_tier(&mut session).await;
        assert_eq!(session.current_tier(), Tier::Completion);

        let finished = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(finished.status(), ProgressStatus::Completed);
        assert_eq!(finished.score(), 40);
        // 10 + 15 question XP plus the 5 bonus.
        assert_eq!(finished.xp_earned(), 30);
        assert!(finished.completed_at().is_some());

        assert!(service.go_to_previous(&mut session).await);
        assert!(service.jump_to(&mut session, Tier::Completion).await);

        let revisited = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(revisited.xp_earned(), 30);
        assert_eq!(revisited.completed_at(), finished.completed_at());
    }

    #[tokio::test]
    async fn locked_jump_changes_nothing() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let service = service_over(&repo);
        let learner = LearnerId::new();

        let mut session = service.start_session(learner, lesson.id()).await.unwrap();
        service.complete_tier(&mut session).await;
        assert_eq!(session.current_tier(), Tier::Steps);

        assert!(!service.jump_to(&mut session, Tier::FillInBlank).await);
        assert_eq!(session.current_tier(), Tier::Steps);

        let stored = repo
            .get_progress(learner, lesson.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts(), 1);
    }

    struct FailingProgressStore;

    #[async_trait::async_trait]
    impl ProgressRepository for FailingProgressStore {
        async fn upsert_progress(&self, _progress: &LessonProgress) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk offline".into()))
        }

        async fn get_progress(
            &self,
            _learner_id: LearnerId,
            _lesson_id: LessonId,
        ) -> Result<Option<LessonProgress>, StorageError> {
            Ok(None)
        }

        async fn list_progress_for_lesson(
            &self,
            _lesson_id: LessonId,
        ) -> Result<Vec<LessonProgress>, StorageError> {
            Ok(Vec::new())
        }

        async fn list_progress_for_learner(
            &self,
            _learner_id: LearnerId,
        ) -> Result<Vec<LessonProgress>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_save_is_swallowed_and_flagged() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = seeded_lesson(&repo).await;
        let progress = ProgressService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(FailingProgressStore),
        );
        let service = LessonSessionService::new(repo.clone(), progress);

        let mut session = service
            .start_session(LearnerId::new(), lesson.id())
            .await
            .unwrap();

        // The transition itself succeeds; only the save is lost.
        assert!(service.complete_tier(&mut session).await);
        assert_eq!(session.current_tier(), Tier::Steps);
        assert!(session.has_unsaved_changes());

        service.complete_tier(&mut session).await;
        let right = service.check_answer(&mut session, "a").await;
        assert!(right.correct);
        assert_eq!(session.progress().score(), 20);
        assert!(session.has_unsaved_changes());
    }
}
