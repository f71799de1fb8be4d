use std::sync::Arc;

use encore_core::model::{LearnerId, LessonId, LessonProgress};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::SessionError;

/// Persistence adapter for progress snapshots.
///
/// Owns the attempt counter and the lifecycle timestamps, so callers hand in
/// plain machine state and get back the stamped row that storage holds.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Load one learner's stored progress in one lesson, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn load(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, SessionError> {
        let stored = self.progress.get_progress(learner_id, lesson_id).await?;
        Ok(stored)
    }

    /// Stamp and persist a snapshot, returning the stamped copy.
    ///
    /// `attempts` becomes the stored count plus one (fetched first; the race
    /// between concurrent sessions of one learner is accepted). `started_at`
    /// keeps the stored value or is stamped now; `completed_at` is stamped on
    /// the transition into completed and kept afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn save(&self, snapshot: &LessonProgress) -> Result<LessonProgress, SessionError> {
        let stored = self
            .progress
            .get_progress(snapshot.learner_id(), snapshot.lesson_id())
            .await?;
        let (attempts, started_at, completed_at) = match &stored {
            Some(row) => (row.attempts(), row.started_at(), row.completed_at()),
            None => (0, None, None),
        };

        let mut stamped = snapshot.clone();
        stamped.stamp_for_save(attempts, started_at, completed_at, self.clock.now());
        self.progress.upsert_progress(&stamped).await?;
        Ok(stamped)
    }
}
