use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::LessonId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while authoring tier content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TierError {
    #[error("invalid tier number: {0}")]
    InvalidTierNumber(u8),

    #[error("intro heading cannot be empty")]
    EmptyHeading,

    #[error("intro body cannot be empty")]
    EmptyBody,

    #[error("invalid media url: {0}")]
    InvalidMediaUrl(String),

    #[error("steps tier needs at least one step")]
    NoSteps,

    #[error("step {0} cannot be empty")]
    EmptyStep(usize),

    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("multiple choice needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option id cannot be empty")]
    EmptyOptionId,

    #[error("option id is not unique: {0}")]
    DuplicateOptionId(String),

    #[error("exactly one option must be marked correct, found {0}")]
    CorrectCountMismatch(usize),

    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("reward summary cannot be empty")]
    EmptySummary,

    #[error("tier set must contain exactly five tiers, got {0}")]
    WrongTierCount(usize),

    #[error("tier {0} holds the wrong content kind")]
    TierMismatch(u8),
}

//
// ─── TIER NUMBER ───────────────────────────────────────────────────────────────
//

/// The five ordered tiers of a lesson.
///
/// Every lesson walks the same ladder: read the intro, follow the worked
/// steps, answer a multiple-choice question, answer a fill-in-blank question,
/// and land on the completion screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Intro,
    Steps,
    MultipleChoice,
    FillInBlank,
    Completion,
}

impl Tier {
    /// All five tiers in lesson order.
    pub const ALL: [Tier; 5] = [
        Tier::Intro,
        Tier::Steps,
        Tier::MultipleChoice,
        Tier::FillInBlank,
        Tier::Completion,
    ];

    /// Converts a 1-based tier number to a `Tier`.
    ///
    /// # Errors
    ///
    /// Returns `TierError::InvalidTierNumber` if the value is not in 1..=5.
    pub fn from_u8(value: u8) -> Result<Self, TierError> {
        match value {
            1 => Ok(Self::Intro),
            2 => Ok(Self::Steps),
            3 => Ok(Self::MultipleChoice),
            4 => Ok(Self::FillInBlank),
            5 => Ok(Self::Completion),
            _ => Err(TierError::InvalidTierNumber(value)),
        }
    }

    /// The 1-based position of this tier.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Tier::Intro => 1,
            Tier::Steps => 2,
            Tier::MultipleChoice => 3,
            Tier::FillInBlank => 4,
            Tier::Completion => 5,
        }
    }

    /// The tier after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Intro => Some(Tier::Steps),
            Tier::Steps => Some(Tier::MultipleChoice),
            Tier::MultipleChoice => Some(Tier::FillInBlank),
            Tier::FillInBlank => Some(Tier::Completion),
            Tier::Completion => None,
        }
    }

    /// The tier before this one, if any.
    #[must_use]
    pub fn previous(self) -> Option<Tier> {
        match self {
            Tier::Intro => None,
            Tier::Steps => Some(Tier::Intro),
            Tier::MultipleChoice => Some(Tier::Steps),
            Tier::FillInBlank => Some(Tier::MultipleChoice),
            Tier::Completion => Some(Tier::FillInBlank),
        }
    }

    /// True for the two tiers that take a learner answer.
    #[must_use]
    pub fn is_question(self) -> bool {
        matches!(self, Tier::MultipleChoice | Tier::FillInBlank)
    }

    /// True for the terminal tier.
    #[must_use]
    pub fn is_last(self) -> bool {
        matches!(self, Tier::Completion)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

//
// ─── TIER CONTENT ──────────────────────────────────────────────────────────────
//

/// Intro tier: a short read with optional media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroTier {
    heading: String,
    body: String,
    media_url: Option<String>,
}

impl IntroTier {
    /// Creates intro content.
    ///
    /// # Errors
    ///
    /// Returns `TierError` if heading or body is blank, or the media URL does
    /// not parse.
    pub fn new(
        heading: impl Into<String>,
        body: impl Into<String>,
        media_url: Option<String>,
    ) -> Result<Self, TierError> {
        let heading = heading.into();
        if heading.trim().is_empty() {
            return Err(TierError::EmptyHeading);
        }
        let body = body.into();
        if body.trim().is_empty() {
            return Err(TierError::EmptyBody);
        }
        let media_url = match media_url {
            None => None,
            Some(raw) => {
                let raw = raw.trim().to_owned();
                if raw.is_empty() {
                    None
                } else {
                    Url::parse(&raw).map_err(|_| TierError::InvalidMediaUrl(raw.clone()))?;
                    Some(raw)
                }
            }
        };

        Ok(Self {
            heading: heading.trim().to_owned(),
            body: body.trim().to_owned(),
            media_url,
        })
    }

    #[must_use]
    pub fn heading(&self) -> &str {
        &self.heading
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }
}

/// Steps tier: an ordered walkthrough of the technique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsTier {
    steps: Vec<String>,
}

impl StepsTier {
    /// Creates a steps list.
    ///
    /// # Errors
    ///
    /// Returns `TierError::NoSteps` for an empty list and
    /// `TierError::EmptyStep` for a blank entry.
    pub fn new(steps: Vec<String>) -> Result<Self, TierError> {
        if steps.is_empty() {
            return Err(TierError::NoSteps);
        }
        let mut trimmed = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            let step = step.trim().to_owned();
            if step.is_empty() {
                return Err(TierError::EmptyStep(index));
            }
            trimmed.push(step);
        }

        Ok(Self { steps: trimmed })
    }

    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// One selectable option on a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl ChoiceOption {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_correct,
        }
    }
}

/// Multiple-choice tier: pick the one correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceTier {
    question: String,
    options: Vec<ChoiceOption>,
    xp_reward: u32,
}

impl MultipleChoiceTier {
    /// Creates a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `TierError` unless the question is non-blank, there are at
    /// least two options with unique non-empty ids, and exactly one option is
    /// marked correct.
    pub fn new(
        question: impl Into<String>,
        options: Vec<ChoiceOption>,
        xp_reward: u32,
    ) -> Result<Self, TierError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(TierError::EmptyQuestion);
        }
        if options.len() < 2 {
            return Err(TierError::TooFewOptions(options.len()));
        }
        let mut seen = Vec::with_capacity(options.len());
        for option in &options {
            if option.id.trim().is_empty() {
                return Err(TierError::EmptyOptionId);
            }
            if seen.contains(&option.id.as_str()) {
                return Err(TierError::DuplicateOptionId(option.id.clone()));
            }
            seen.push(option.id.as_str());
        }
        let correct = options.iter().filter(|o| o.is_correct).count();
        if correct != 1 {
            return Err(TierError::CorrectCountMismatch(correct));
        }

        Ok(Self {
            question: question.trim().to_owned(),
            options,
            xp_reward,
        })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, id: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        self.xp_reward
    }
}

/// Fill-in-blank tier: free-text answer with acceptable variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInBlankTier {
    question: String,
    answer: String,
    acceptable_answers: Vec<String>,
    xp_reward: u32,
}

impl FillInBlankTier {
    /// Creates a fill-in-blank question.
    ///
    /// Blank variants are dropped; the primary answer always counts as
    /// acceptable and need not be repeated in the variant list.
    ///
    /// # Errors
    ///
    /// Returns `TierError` if the question or primary answer is blank.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        acceptable_answers: Vec<String>,
        xp_reward: u32,
    ) -> Result<Self, TierError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(TierError::EmptyQuestion);
        }
        let answer = answer.into();
        if answer.trim().is_empty() {
            return Err(TierError::EmptyAnswer);
        }
        let acceptable_answers: Vec<String> = acceptable_answers
            .into_iter()
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect();

        Ok(Self {
            question: question.trim().to_owned(),
            answer: answer.trim().to_owned(),
            acceptable_answers,
            xp_reward,
        })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn acceptable_answers(&self) -> &[String] {
        &self.acceptable_answers
    }

    /// The primary answer followed by every configured variant.
    pub fn all_answers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.answer.as_str())
            .chain(self.acceptable_answers.iter().map(String::as_str))
    }

    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        self.xp_reward
    }
}

/// Completion tier: reward summary plus optional badge and follow-up lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTier {
    summary: String,
    bonus_xp: u32,
    badge_key: Option<String>,
    next_lesson: Option<LessonId>,
}

impl CompletionTier {
    /// Creates the completion screen content.
    ///
    /// # Errors
    ///
    /// Returns `TierError::EmptySummary` if the summary text is blank.
    pub fn new(
        summary: impl Into<String>,
        bonus_xp: u32,
        badge_key: Option<String>,
        next_lesson: Option<LessonId>,
    ) -> Result<Self, TierError> {
        let summary = summary.into();
        if summary.trim().is_empty() {
            return Err(TierError::EmptySummary);
        }
        let badge_key = badge_key
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());

        Ok(Self {
            summary: summary.trim().to_owned(),
            bonus_xp,
            badge_key,
            next_lesson,
        })
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub fn bonus_xp(&self) -> u32 {
        self.bonus_xp
    }

    #[must_use]
    pub fn badge_key(&self) -> Option<&str> {
        self.badge_key.as_deref()
    }

    #[must_use]
    pub fn next_lesson(&self) -> Option<LessonId> {
        self.next_lesson
    }
}

/// Content for a single tier, tagged by kind.
///
/// The tag rides along in serialized form so stored content can never be
/// rehydrated as the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TierContent {
    Intro(IntroTier),
    Steps(StepsTier),
    MultipleChoice(MultipleChoiceTier),
    FillInBlank(FillInBlankTier),
    Completion(CompletionTier),
}

impl TierContent {
    /// The tier this content belongs to.
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            TierContent::Intro(_) => Tier::Intro,
            TierContent::Steps(_) => Tier::Steps,
            TierContent::MultipleChoice(_) => Tier::MultipleChoice,
            TierContent::FillInBlank(_) => Tier::FillInBlank,
            TierContent::Completion(_) => Tier::Completion,
        }
    }

    /// XP configured on this tier: question reward or completion bonus.
    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        match self {
            TierContent::Intro(_) | TierContent::Steps(_) => 0,
            TierContent::MultipleChoice(mc) => mc.xp_reward(),
            TierContent::FillInBlank(fib) => fib.xp_reward(),
            TierContent::Completion(done) => done.bonus_xp(),
        }
    }
}

//
// ─── TIER SET ──────────────────────────────────────────────────────────────────
//

/// The full content of a lesson: one entry per tier, in order.
///
/// A product of the five tier types, so a lesson can neither miss a tier nor
/// carry two of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSet {
    intro: IntroTier,
    steps: StepsTier,
    multiple_choice: MultipleChoiceTier,
    fill_in_blank: FillInBlankTier,
    completion: CompletionTier,
}

impl TierSet {
    #[must_use]
    pub fn new(
        intro: IntroTier,
        steps: StepsTier,
        multiple_choice: MultipleChoiceTier,
        fill_in_blank: FillInBlankTier,
        completion: CompletionTier,
    ) -> Self {
        Self {
            intro,
            steps,
            multiple_choice,
            fill_in_blank,
            completion,
        }
    }

    /// Rehydrates a tier set from an ordered list of tagged contents.
    ///
    /// # Errors
    ///
    /// Returns `TierError::WrongTierCount` unless exactly five entries are
    /// given, and `TierError::TierMismatch` if an entry sits at the wrong
    /// position.
    pub fn from_contents(contents: Vec<TierContent>) -> Result<Self, TierError> {
        if contents.len() != 5 {
            return Err(TierError::WrongTierCount(contents.len()));
        }
        let mut intro = None;
        let mut steps = None;
        let mut multiple_choice = None;
        let mut fill_in_blank = None;
        let mut completion = None;
        for (index, content) in contents.into_iter().enumerate() {
            let expected = Tier::ALL[index];
            if content.tier() != expected {
                return Err(TierError::TierMismatch(expected.number()));
            }
            match content {
                TierContent::Intro(t) => intro = Some(t),
                TierContent::Steps(t) => steps = Some(t),
                TierContent::MultipleChoice(t) => multiple_choice = Some(t),
                TierContent::FillInBlank(t) => fill_in_blank = Some(t),
                TierContent::Completion(t) => completion = Some(t),
            }
        }

        // The position check above guarantees every slot was filled.
        match (intro, steps, multiple_choice, fill_in_blank, completion) {
            (Some(i), Some(s), Some(mc), Some(fib), Some(done)) => {
                Ok(Self::new(i, s, mc, fib, done))
            }
            _ => Err(TierError::WrongTierCount(0)),
        }
    }

    /// All five contents in tier order, for serialization.
    #[must_use]
    pub fn contents(&self) -> Vec<TierContent> {
        vec![
            TierContent::Intro(self.intro.clone()),
            TierContent::Steps(self.steps.clone()),
            TierContent::MultipleChoice(self.multiple_choice.clone()),
            TierContent::FillInBlank(self.fill_in_blank.clone()),
            TierContent::Completion(self.completion.clone()),
        ]
    }

    /// The content for one tier.
    #[must_use]
    pub fn content(&self, tier: Tier) -> TierContent {
        match tier {
            Tier::Intro => TierContent::Intro(self.intro.clone()),
            Tier::Steps => TierContent::Steps(self.steps.clone()),
            Tier::MultipleChoice => TierContent::MultipleChoice(self.multiple_choice.clone()),
            Tier::FillInBlank => TierContent::FillInBlank(self.fill_in_blank.clone()),
            Tier::Completion => TierContent::Completion(self.completion.clone()),
        }
    }

    #[must_use]
    pub fn intro(&self) -> &IntroTier {
        &self.intro
    }

    #[must_use]
    pub fn steps(&self) -> &StepsTier {
        &self.steps
    }

    #[must_use]
    pub fn multiple_choice(&self) -> &MultipleChoiceTier {
        &self.multiple_choice
    }

    #[must_use]
    pub fn fill_in_blank(&self) -> &FillInBlankTier {
        &self.fill_in_blank
    }

    #[must_use]
    pub fn completion(&self) -> &CompletionTier {
        &self.completion
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
