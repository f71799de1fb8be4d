mod ids;
mod lesson;
mod progress;
mod tier;

pub use ids::{LearnerId, LessonId, ParseIdError};
pub use lesson::{Difficulty, Lesson, LessonDraft, LessonError};
pub use progress::{CompletedTiers, LessonProgress, ProgressError, ProgressStatus};
pub use tier::{
    ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, MultipleChoiceTier, StepsTier, Tier,
    TierContent, TierError, TierSet,
};
