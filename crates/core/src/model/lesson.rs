use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::LessonId;
use crate::model::tier::{Tier, TierContent, TierError, TierSet};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("artist name cannot be empty")]
    EmptyArtist,

    #[error("topic cannot be empty")]
    EmptyTopic,

    #[error("difficulty must be between 1 and 5, got {0}")]
    InvalidDifficulty(u8),

    #[error(transparent)]
    Tier(#[from] TierError),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Author-assigned difficulty on a 1 (easiest) to 5 (hardest) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Difficulty(u8);

impl Difficulty {
    /// Creates a difficulty level.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::InvalidDifficulty` if the value is not in 1..=5.
    pub fn new(value: u8) -> Result<Self, LessonError> {
        if !(1..=5).contains(&value) {
            return Err(LessonError::InvalidDifficulty(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying 1-5 value
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── LESSON DRAFT ──────────────────────────────────────────────────────────────
//

/// Author input for a lesson before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub description: Option<String>,
    pub artist: String,
    pub topic: String,
    pub difficulty: u8,
    pub published: bool,
    pub tiers: TierSet,
}

impl LessonDraft {
    /// Validates the draft into a `Lesson` with the given identity and
    /// timestamps.
    ///
    /// New lessons pass `created_at == now`; edits keep the stored
    /// `created_at` and stamp `now` as the update time.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for blank title, artist, or topic, or an
    /// out-of-range difficulty. Tier content is validated at construction and
    /// arrives here already checked.
    pub fn validate(
        self,
        id: LessonId,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Lesson, LessonError> {
        if self.title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if self.artist.trim().is_empty() {
            return Err(LessonError::EmptyArtist);
        }
        if self.topic.trim().is_empty() {
            return Err(LessonError::EmptyTopic);
        }
        let difficulty = Difficulty::new(self.difficulty)?;
        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Lesson {
            id,
            title: self.title.trim().to_owned(),
            description,
            artist: self.artist.trim().to_owned(),
            topic: self.topic.trim().to_owned(),
            difficulty,
            published: self.published,
            tiers: self.tiers,
            created_at,
            updated_at: now,
        })
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A published or draft algebra lesson themed around one artist.
///
/// Owns the five-tier content plus the catalogue metadata learners browse by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    description: Option<String>,
    artist: String,
    topic: String,
    difficulty: Difficulty,
    published: bool,
    tiers: TierSet,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Lesson {
    /// Rehydrates a lesson from persisted storage.
    ///
    /// Performs the same cheap field checks as draft validation; tier content
    /// arrives as already-tagged values and is checked for order only.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if stored fields fail validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: LessonId,
        title: String,
        description: Option<String>,
        artist: String,
        topic: String,
        difficulty: u8,
        published: bool,
        contents: Vec<TierContent>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let tiers = TierSet::from_contents(contents)?;
        LessonDraft {
            title,
            description,
            artist,
            topic,
            difficulty,
            published,
            tiers,
        }
        .validate(id, created_at, updated_at)
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.published
    }

    #[must_use]
    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    /// Content for one tier of this lesson.
    #[must_use]
    pub fn tier_content(&self, tier: Tier) -> TierContent {
        self.tiers.content(tier)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tier::{
        ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, MultipleChoiceTier, StepsTier,
    };
    use crate::time::fixed_now;

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
            FillInBlankTier::new("How many members?", "eight", vec![], 15).unwrap(),
            CompletionTier::new("Encore!", 5, Some("debut".into()), None).unwrap(),
        )
    }

    fn sample_draft() -> LessonDraft {
        LessonDraft {
            title: "Linear equations with NewJeans".into(),
            description: Some("Solve for x with the group's discography.".into()),
            artist: "NewJeans".into(),
            topic: "linear-equations".into(),
            difficulty: 2,
            published: true,
            tiers: sample_tiers(),
        }
    }

    #[test]
    fn draft_rejects_blank_title() {
        let mut draft = sample_draft();
        draft.title = "   ".into();
        let err = draft
            .validate(LessonId::new(), fixed_now(), fixed_now())
            .unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn draft_rejects_blank_artist_and_topic() {
        let mut draft = sample_draft();
        draft.artist = "  ".into();
        let err = draft
            .validate(LessonId::new(), fixed_now(), fixed_now())
            .unwrap_err();
        assert_eq!(err, LessonError::EmptyArtist);

        let mut draft = sample_draft();
        draft.topic = String::new();
        let err = draft
            .validate(LessonId::new(), fixed_now(), fixed_now())
            .unwrap_err();
        assert_eq!(err, LessonError::EmptyTopic);
    }

    #[test]
    fn draft_rejects_out_of_range_difficulty() {
        let mut draft = sample_draft();
        draft.difficulty = 0;
        let err = draft
            .validate(LessonId::new(), fixed_now(), fixed_now())
            .unwrap_err();
        assert_eq!(err, LessonError::InvalidDifficulty(0));

        let mut draft = sample_draft();
        draft.difficulty = 6;
        let err = draft
            .validate(LessonId::new(), fixed_now(), fixed_now())
            .unwrap_err();
        assert_eq!(err, LessonError::InvalidDifficulty(6));
    }

    #[test]
    fn draft_trims_and_filters_description() {
        let mut draft = sample_draft();
        draft.title = "  Spaced title  ".into();
        draft.description = Some("   ".into());
        let lesson = draft
            .validate(LessonId::new(), fixed_now(), fixed_now())
            .unwrap();
        assert_eq!(lesson.title(), "Spaced title");
        assert_eq!(lesson.description(), None);
    }

    #[test]
    fn lesson_happy_path() {
        let id = LessonId::new();
        let lesson = sample_draft().validate(id, fixed_now(), fixed_now()).unwrap();

        assert_eq!(lesson.id(), id);
        assert_eq!(lesson.artist(), "NewJeans");
        assert_eq!(lesson.difficulty().value(), 2);
        assert!(lesson.is_published());
        assert_eq!(lesson.tiers().multiple_choice().xp_reward(), 10);
        assert_eq!(
            lesson.tier_content(Tier::Completion).xp_reward(),
            lesson.tiers().completion().bonus_xp()
        );
    }

    #[test]
    fn from_persisted_roundtrip() {
        let id = LessonId::new();
        let lesson = sample_draft().validate(id, fixed_now(), fixed_now()).unwrap();

        let rebuilt = Lesson::from_persisted(
            lesson.id(),
            lesson.title().to_owned(),
            lesson.description().map(str::to_owned),
            lesson.artist().to_owned(),
            lesson.topic().to_owned(),
            lesson.difficulty().value(),
            lesson.is_published(),
            lesson.tiers().contents(),
            lesson.created_at(),
            lesson.updated_at(),
        )
        .unwrap();

        assert_eq!(rebuilt, lesson);
    }
}
