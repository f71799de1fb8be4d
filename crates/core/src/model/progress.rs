use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LearnerId, LessonId};
use crate::model::tier::{Tier, TierError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while rehydrating progress from storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown progress status: {0}")]
    UnknownStatus(String),

    #[error("completed tier mask has bits outside the five tiers: {0:#04x}")]
    InvalidTierMask(u8),

    #[error("completed status requires the completion tier in the completed set")]
    MissingCompletionTier,

    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error(transparent)]
    Tier(#[from] TierError),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a learner's run through a lesson.
///
/// `Completed` is entered exactly when the learner reaches the completion
/// tier and is never left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// Stable wire and storage spelling of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ProgressError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── COMPLETED TIERS ───────────────────────────────────────────────────────────
//

fn tier_bit(tier: Tier) -> u8 {
    match tier {
        Tier::Intro => 1 << 0,
        Tier::Steps => 1 << 1,
        Tier::MultipleChoice => 1 << 2,
        Tier::FillInBlank => 1 << 3,
        Tier::Completion => 1 << 4,
    }
}

const ALL_TIER_BITS: u8 = 0b1_1111;

/// Set of tiers the learner has completed, packed into five bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletedTiers(u8);

impl CompletedTiers {
    /// The empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    /// Rebuilds the set from a stored bitmask.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidTierMask` if bits outside the five
    /// tiers are set.
    pub fn from_bits(bits: u8) -> Result<Self, ProgressError> {
        if bits & !ALL_TIER_BITS != 0 {
            return Err(ProgressError::InvalidTierMask(bits));
        }
        Ok(Self(bits))
    }

    /// The raw bitmask, for storage.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, tier: Tier) -> bool {
        self.0 & tier_bit(tier) != 0
    }

    pub fn insert(&mut self, tier: Tier) {
        self.0 |= tier_bit(tier);
    }

    /// Returns a copy with the tier added.
    #[must_use]
    pub fn with(mut self, tier: Tier) -> Self {
        self.insert(tier);
        self
    }

    #[must_use]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Completed tiers in lesson order.
    pub fn iter(self) -> impl Iterator<Item = Tier> {
        Tier::ALL.into_iter().filter(move |t| self.contains(*t))
    }

    /// The highest completed tier, if any.
    #[must_use]
    pub fn highest(self) -> Option<Tier> {
        Tier::ALL.into_iter().rev().find(|t| self.contains(*t))
    }

    /// The furthest tier the learner may enter.
    ///
    /// One past the highest completed tier, capped at the completion tier;
    /// the intro is always open.
    #[must_use]
    pub fn max_unlocked(self) -> Tier {
        match self.highest() {
            None => Tier::Intro,
            Some(top) => top.next().unwrap_or(Tier::Completion),
        }
    }
}

//
// ─── PROGRESS SNAPSHOT ─────────────────────────────────────────────────────────
//

/// A learner's saved position and earnings in one lesson.
///
/// This is the unit the persistence layer writes after every answer check and
/// tier transition. It carries the full state, so the latest write always
/// reflects the session regardless of which earlier writes were lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    learner_id: LearnerId,
    lesson_id: LessonId,
    current_tier: Tier,
    completed: CompletedTiers,
    score: u32,
    xp_earned: u32,
    status: ProgressStatus,
    attempts: u32,
    time_spent_secs: u32,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    /// A zeroed snapshot for a learner who has not opened the lesson yet.
    #[must_use]
    pub fn fresh(learner_id: LearnerId, lesson_id: LessonId) -> Self {
        Self {
            learner_id,
            lesson_id,
            current_tier: Tier::Intro,
            completed: CompletedTiers::empty(),
            score: 0,
            xp_earned: 0,
            status: ProgressStatus::NotStarted,
            attempts: 0,
            time_spent_secs: 0,
            started_at: None,
            completed_at: None,
        }
    }

    /// Rehydrates a snapshot from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the tier mask is malformed, the timestamps
    /// are out of order, or a completed status lacks the completion tier.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        learner_id: LearnerId,
        lesson_id: LessonId,
        current_tier: u8,
        completed_bits: u8,
        score: u32,
        xp_earned: u32,
        status: ProgressStatus,
        attempts: u32,
        time_spent_secs: u32,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ProgressError> {
        let current_tier = Tier::from_u8(current_tier)?;
        let completed = CompletedTiers::from_bits(completed_bits)?;
        if status == ProgressStatus::Completed && !completed.contains(Tier::Completion) {
            return Err(ProgressError::MissingCompletionTier);
        }
        if let (Some(started), Some(done)) = (started_at, completed_at) {
            if done < started {
                return Err(ProgressError::InvalidTimeRange);
            }
        }

        Ok(Self {
            learner_id,
            lesson_id,
            current_tier,
            completed,
            score,
            xp_earned,
            status,
            attempts,
            time_spent_secs,
            started_at,
            completed_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn current_tier(&self) -> Tier {
        self.current_tier
    }

    #[must_use]
    pub fn completed(&self) -> CompletedTiers {
        self.completed
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn xp_earned(&self) -> u32 {
        self.xp_earned
    }

    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }

    // State used by the progression machine; crate-private so all mutation
    // flows through it.
    pub(crate) fn set_current_tier(&mut self, tier: Tier) {
        self.current_tier = tier;
    }

    pub(crate) fn mark_completed_tier(&mut self, tier: Tier) {
        self.completed.insert(tier);
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub(crate) fn add_xp(&mut self, xp: u32) {
        self.xp_earned = self.xp_earned.saturating_add(xp);
    }

    pub(crate) fn set_status(&mut self, status: ProgressStatus) {
        self.status = status;
    }

    pub(crate) fn add_time_spent(&mut self, secs: u32) {
        self.time_spent_secs = self.time_spent_secs.saturating_add(secs);
    }

    /// Stamps the attempt count and timestamps the persistence layer owns.
    ///
    /// `attempts` is the stored value plus one; `started_at` keeps the first
    /// stamp; `completed_at` is stamped only on the transition into
    /// `Completed`.
    pub fn stamp_for_save(
        &mut self,
        stored_attempts: u32,
        stored_started_at: Option<DateTime<Utc>>,
        stored_completed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        self.attempts = stored_attempts.saturating_add(1);
        self.started_at = stored_started_at.or(Some(now));
        self.completed_at = match stored_completed_at {
            Some(existing) => Some(existing),
            None if self.status == ProgressStatus::Completed => Some(now),
            None => None,
        };
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn status_string_roundtrip() {
        for status in [
            ProgressStatus::NotStarted,
            ProgressStatus::InProgress,
            ProgressStatus::Completed,
        ] {
            let parsed: ProgressStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        let err = "paused".parse::<ProgressStatus>().unwrap_err();
        assert_eq!(err, ProgressError::UnknownStatus("paused".into()));
    }

    #[test]
    fn completed_tiers_insert_and_contains() {
        let mut set = CompletedTiers::empty();
        assert!(set.is_empty());
        set.insert(Tier::Intro);
        set.insert(Tier::Steps);
        assert!(set.contains(Tier::Intro));
        assert!(set.contains(Tier::Steps));
        assert!(!set.contains(Tier::MultipleChoice));
        assert_eq!(set.len(), 2);
        assert_eq!(set.highest(), Some(Tier::Steps));
    }

    #[test]
    fn completed_tiers_mask_roundtrip() {
        let set = CompletedTiers::empty()
            .with(Tier::Intro)
            .with(Tier::MultipleChoice);
        let rebuilt = CompletedTiers::from_bits(set.bits()).unwrap();
        assert_eq!(rebuilt, set);

        let err = CompletedTiers::from_bits(0b10_0000).unwrap_err();
        assert_eq!(err, ProgressError::InvalidTierMask(0b10_0000));
    }

    #[test]
    fn max_unlocked_is_one_past_highest_completed() {
        assert_eq!(CompletedTiers::empty().max_unlocked(), Tier::Intro);

        let set = CompletedTiers::empty().with(Tier::Intro);
        assert_eq!(set.max_unlocked(), Tier::Steps);

        let set = set.with(Tier::Steps).with(Tier::MultipleChoice);
        assert_eq!(set.max_unlocked(), Tier::FillInBlank);

        let all = set.with(Tier::FillInBlank).with(Tier::Completion);
        assert_eq!(all.max_unlocked(), Tier::Completion);
    }

    #[test]
    fn fresh_progress_is_zeroed() {
        let progress = LessonProgress::fresh(LearnerId::new(), LessonId::new());
        assert_eq!(progress.current_tier(), Tier::Intro);
        assert_eq!(progress.status(), ProgressStatus::NotStarted);
        assert_eq!(progress.score(), 0);
        assert_eq!(progress.xp_earned(), 0);
        assert_eq!(progress.attempts(), 0);
        assert!(progress.completed().is_empty());
        assert_eq!(progress.started_at(), None);
        assert_eq!(progress.completed_at(), None);
    }

    #[test]
    fn from_persisted_rejects_inconsistent_completion() {
        let err = LessonProgress::from_persisted(
            LearnerId::new(),
            LessonId::new(),
            5,
            0b0_1111,
            40,
            25,
            ProgressStatus::Completed,
            3,
            120,
            Some(fixed_now()),
            Some(fixed_now()),
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::MissingCompletionTier);
    }

    #[test]
    fn from_persisted_rejects_reversed_timestamps() {
        let started = fixed_now();
        let before = started - chrono::Duration::seconds(60);
        let err = LessonProgress::from_persisted(
            LearnerId::new(),
            LessonId::new(),
            5,
            ALL_TIER_BITS,
            40,
            30,
            ProgressStatus::Completed,
            3,
            120,
            Some(started),
            Some(before),
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::InvalidTimeRange);
    }

    #[test]
    fn stamp_for_save_increments_attempts_and_keeps_started_at() {
        let mut progress = LessonProgress::fresh(LearnerId::new(), LessonId::new());
        progress.set_status(ProgressStatus::InProgress);

        let first_save = fixed_now();
        progress.stamp_for_save(0, None, None, first_save);
        assert_eq!(progress.attempts(), 1);
        assert_eq!(progress.started_at(), Some(first_save));
        assert_eq!(progress.completed_at(), None);

        let later = first_save + chrono::Duration::seconds(30);
        progress.stamp_for_save(1, Some(first_save), None, later);
        assert_eq!(progress.attempts(), 2);
        assert_eq!(progress.started_at(), Some(first_save));
    }

    #[test]
    fn stamp_for_save_sets_completed_at_once() {
        let mut progress = LessonProgress::fresh(LearnerId::new(), LessonId::new());
        progress.set_status(ProgressStatus::Completed);
        progress.mark_completed_tier(Tier::Completion);

        let done_at = fixed_now();
        progress.stamp_for_save(4, Some(done_at), None, done_at);
        assert_eq!(progress.completed_at(), Some(done_at));

        let later = done_at + chrono::Duration::seconds(90);
        progress.stamp_for_save(5, Some(done_at), Some(done_at), later);
        assert_eq!(progress.completed_at(), Some(done_at));
    }
}
