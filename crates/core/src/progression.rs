use crate::evaluator::{Evaluation, evaluate};
use crate::model::{LearnerId, LessonId, LessonProgress, ProgressStatus, Tier, TierContent, TierSet};

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

/// Per-visit answer feedback. Cleared on every tier change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Feedback {
    shown: bool,
    evaluation: Option<Evaluation>,
}

impl Feedback {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_correct(&self) -> bool {
        self.evaluation.is_some_and(|e| e.correct)
    }
}

//
// ─── PROGRESSION ───────────────────────────────────────────────────────────────
//

/// The tier ladder for one learner working one lesson.
///
/// Owns the lesson's tier content plus the learner's progress snapshot and
/// applies every transition rule: completion gating on the question tiers,
/// the unlock window for jumps, and the one-shot completion bonus. Every
/// operation is total; a transition that is not allowed right now leaves the
/// state untouched instead of failing, so a stale or mischievous caller can
/// click anything without corrupting progress.
#[derive(Debug, Clone)]
pub struct TierProgression {
    tiers: TierSet,
    progress: LessonProgress,
    feedback: Feedback,
}

/// Points added to the score for each correct answer on a question tier.
pub const CORRECT_ANSWER_POINTS: u32 = 20;

impl TierProgression {
    /// Starts the lesson from the intro with a zeroed snapshot.
    #[must_use]
    pub fn start(tiers: TierSet, learner_id: LearnerId, lesson_id: LessonId) -> Self {
        Self::resume(tiers, LessonProgress::fresh(learner_id, lesson_id))
    }

    /// Resumes from a stored snapshot.
    ///
    /// Rehydration trusts the snapshot as-is: entry effects (the completion
    /// bonus among them) fire on transitions only, so re-opening a finished
    /// lesson awards nothing.
    #[must_use]
    pub fn resume(tiers: TierSet, progress: LessonProgress) -> Self {
        Self {
            tiers,
            progress,
            feedback: Feedback::default(),
        }
    }

    // Accessors
    #[must_use]
    pub fn progress(&self) -> &LessonProgress {
        &self.progress
    }

    #[must_use]
    pub fn current_tier(&self) -> Tier {
        self.progress.current_tier()
    }

    /// Content of the tier the learner is looking at.
    #[must_use]
    pub fn current_content(&self) -> TierContent {
        self.tiers.content(self.current_tier())
    }

    /// Whether answer feedback is on screen for the current visit.
    #[must_use]
    pub fn show_feedback(&self) -> bool {
        self.feedback.shown
    }

    /// Whether the current visit's answer was checked and correct.
    #[must_use]
    pub fn is_answer_correct(&self) -> bool {
        self.feedback.is_correct()
    }

    /// The furthest tier the learner may enter right now.
    #[must_use]
    pub fn max_unlocked(&self) -> Tier {
        self.progress.completed().max_unlocked()
    }

    /// Whether `complete_tier` would advance from the current tier.
    #[must_use]
    pub fn can_complete_current(&self) -> bool {
        let current = self.current_tier();
        if current.is_last() {
            return false;
        }
        if current.is_question() {
            return self.feedback.shown && self.feedback.is_correct();
        }
        true
    }

    /// Checks a submitted answer against the current tier.
    ///
    /// On the first correct check of a visit the score and XP are banked; a
    /// repeat check afterwards returns the same verdict without touching
    /// anything, so holding the button cannot double-award. On a non-question
    /// tier this evaluates to incorrect and changes nothing.
    pub fn check_answer(&mut self, submission: &str) -> Evaluation {
        let current = self.current_tier();
        if !current.is_question() {
            return Evaluation::incorrect();
        }
        if let Some(prior) = self.feedback.evaluation {
            if prior.correct {
                return prior;
            }
        }

        let evaluation = evaluate(&self.tiers.content(current), submission);
        self.feedback = Feedback {
            shown: true,
            evaluation: Some(evaluation),
        };
        if evaluation.correct {
            self.progress.add_score(CORRECT_ANSWER_POINTS);
            self.progress.add_xp(evaluation.reward_xp);
        }
        self.mark_in_progress();
        evaluation
    }

    /// Marks the current tier completed and advances to the next.
    ///
    /// Intro and steps complete unconditionally. Question tiers complete only
    /// after a checked correct answer this visit. The completion tier is
    /// terminal. Returns whether the state changed.
    pub fn complete_tier(&mut self) -> bool {
        if !self.can_complete_current() {
            return false;
        }
        let current = self.current_tier();
        let Some(next) = current.next() else {
            return false;
        };
        self.progress.mark_completed_tier(current);
        self.mark_in_progress();
        self.enter(next);
        true
    }

    /// Steps back one tier, if there is one. Returns whether the state
    /// changed.
    pub fn go_to_previous(&mut self) -> bool {
        let Some(previous) = self.current_tier().previous() else {
            return false;
        };
        self.mark_in_progress();
        self.enter(previous);
        true
    }

    /// Jumps straight to a tier, when that tier is open.
    ///
    /// A tier is open if it is the intro, already completed, or within one
    /// step past the highest completed tier. A closed target leaves the state
    /// untouched. Returns whether the jump happened.
    ///
    /// This guards navigation only; the persistence layer never assumes tiers
    /// were visited in order.
    pub fn jump_to(&mut self, target: Tier) -> bool {
        if !self.is_open(target) {
            return false;
        }
        if target == self.current_tier() {
            return false;
        }
        self.mark_in_progress();
        self.enter(target);
        true
    }

    /// Adds wall-clock seconds the learner spent on the lesson.
    pub fn record_time_spent(&mut self, secs: u32) {
        self.progress.add_time_spent(secs);
    }

    fn is_open(&self, target: Tier) -> bool {
        target == Tier::Intro
            || self.progress.completed().contains(target)
            || target <= self.max_unlocked()
    }

    fn mark_in_progress(&mut self) {
        if self.progress.status() == ProgressStatus::NotStarted {
            self.progress.set_status(ProgressStatus::InProgress);
        }
    }

    /// Moves onto a tier and applies its entry effects.
    ///
    /// Entering the completion tier finishes the lesson: the tier joins the
    /// completed set, the status flips to completed, and the bonus XP is
    /// banked. The bonus is gated on the status so it pays out once per
    /// lesson, however often the tier is re-entered afterwards.
    fn enter(&mut self, tier: Tier) {
        self.progress.set_current_tier(tier);
        self.feedback.reset();
        if tier == Tier::Completion {
            if self.progress.status() != ProgressStatus::Completed {
                self.progress.add_xp(self.tiers.completion().bonus_xp());
            }
            self.progress.mark_completed_tier(Tier::Completion);
            self.progress.set_status(ProgressStatus::Completed);
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
