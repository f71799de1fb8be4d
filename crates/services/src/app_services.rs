use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::analytics_service::AnalyticsService;
use crate::error::AppServicesError;
use crate::generation::QuestionGenService;
use crate::lesson_service::LessonService;
use crate::progress_service::ProgressService;
use crate::rate_limit::{InMemoryRateLimitStore, RateLimiter};
use crate::session::LessonSessionService;

/// Generation requests allowed per caller per window.
const GENERATION_MAX_REQUESTS: u32 = 10;
const GENERATION_WINDOW_SECS: u32 = 60;

/// Assembles the full service stack over one storage backend.
///
/// Every dependency is injected here and nowhere else; handlers receive
/// already-wired services and never construct their own.
#[derive(Clone)]
pub struct AppServices {
    lessons: Arc<LessonService>,
    sessions: Arc<LessonSessionService>,
    progress: Arc<ProgressService>,
    analytics: Arc<AnalyticsService>,
    question_gen: Arc<QuestionGenService>,
    rate_limiter: Arc<RateLimiter>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the connection or migrations fail.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over in-memory storage, for tests and prototypes.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    fn from_storage(storage: Storage, clock: Clock) -> Self {
        let progress_service = ProgressService::new(clock, Arc::clone(&storage.progress));
        let lessons = Arc::new(LessonService::new(clock, Arc::clone(&storage.lessons)));
        let sessions = Arc::new(LessonSessionService::new(
            Arc::clone(&storage.lessons),
            progress_service.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(Arc::clone(&storage.progress)));
        let question_gen = Arc::new(QuestionGenService::from_env());
        let rate_limiter = Arc::new(RateLimiter::new(
            clock,
            Arc::new(InMemoryRateLimitStore::new()),
            GENERATION_MAX_REQUESTS,
            GENERATION_WINDOW_SECS,
        ));

        Self {
            lessons,
            sessions,
            progress: Arc::new(progress_service),
            analytics,
            question_gen,
            rate_limiter,
        }
    }

    /// Swap in a differently configured generation service.
    #[must_use]
    pub fn with_question_gen(mut self, service: QuestionGenService) -> Self {
        self.question_gen = Arc::new(service);
        self
    }

    /// Swap in a differently configured rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(limiter);
        self
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<LessonSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }

    #[must_use]
    pub fn question_gen(&self) -> Arc<QuestionGenService> {
        Arc::clone(&self.question_gen)
    }

    #[must_use]
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.rate_limiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use encore_core::model::{
        ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, LearnerId, LessonDraft,
        MultipleChoiceTier, StepsTier, TierSet,
    };
    use encore_core::time::fixed_now;

    fn sample_draft() -> LessonDraft {
        LessonDraft {
            title: "Fractions with BTS".into(),
            description: None,
            artist: "BTS".into(),
            topic: "fractions".into(),
            difficulty: 3,
            published: true,
            tiers: TierSet::new(
                IntroTier::new("Seven members", "Split the group evenly.", None).unwrap(),
                StepsTier::new(vec!["Write the fraction.".into()]).unwrap(),
                MultipleChoiceTier::new(
                    "Half of 7 rounded down?",
                    vec![
                        ChoiceOption::new("a", "3", true),
                        ChoiceOption::new("b", "4", false),
                    ],
                    10,
                )
                .unwrap(),
                FillInBlankTier::new("BTS has ___ members.", "seven", vec!["7".into()], 15)
                    .unwrap(),
                CompletionTier::new("Dynamite!", 25, None, None).unwrap(),
            ),
        }
    }

    #[tokio::test]
    async fn in_memory_services_share_one_backend() {
        let services = AppServices::in_memory(Clock::Fixed(fixed_now()));

        let id = services
            .lessons()
            .create_lesson(sample_draft())
            .await
            .unwrap();
        let listed = services.lessons().list_lessons(true).await.unwrap();
        assert_eq!(listed.len(), 1);

        // The session service sees the lesson the CRUD service wrote.
        let session = services
            .sessions()
            .start_session(LearnerId::new(), id)
            .await
            .unwrap();
        assert_eq!(session.lesson().title(), "Fractions with BTS");
    }

    #[tokio::test]
    async fn question_gen_defaults_to_disabled_without_key() {
        let services = AppServices::in_memory(Clock::Fixed(fixed_now()))
            .with_question_gen(QuestionGenService::new(reqwest::Client::new(), None));
        assert!(!services.question_gen().enabled());
    }
}
