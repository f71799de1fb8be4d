//! Lesson CRUD endpoints.
//!
//! Authoring payloads arrive as plain field bags and pass through the domain
//! constructors, so every content invariant is checked before anything is
//! stored. Responses reuse the tagged [`TierContent`] serialization.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use encore_core::model::{
    ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, Lesson, LessonDraft, LessonId,
    MultipleChoiceTier, StepsTier, TierContent, TierError, TierSet,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::ids::parse_lesson_id;
use crate::AppState;

//
// ─── REQUEST BODIES ────────────────────────────────────────────────────────────
//

/// Body of `POST /api/lessons` and `PUT /api/lessons/:id`.
#[derive(Debug, Deserialize)]
pub struct LessonBody {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub artist: String,
    pub topic: String,
    pub difficulty: u8,
    #[serde(default)]
    pub published: bool,
    pub tiers: TiersBody,
}

/// All five tiers, keyed by name rather than position.
#[derive(Debug, Deserialize)]
pub struct TiersBody {
    pub intro: IntroBody,
    pub steps: StepsBody,
    pub multiple_choice: MultipleChoiceBody,
    pub fill_in_blank: FillInBlankBody,
    pub completion: CompletionBody,
}

#[derive(Debug, Deserialize)]
pub struct IntroBody {
    pub heading: String,
    pub body: String,
    #[serde(default)]
    pub media_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StepsBody {
    pub steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceBody {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub struct MultipleChoiceBody {
    pub question: String,
    pub options: Vec<ChoiceBody>,
    pub xp_reward: u32,
}

#[derive(Debug, Deserialize)]
pub struct FillInBlankBody {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub acceptable_answers: Vec<String>,
    pub xp_reward: u32,
}

#[derive(Debug, Deserialize)]
pub struct CompletionBody {
    pub summary: String,
    pub bonus_xp: u32,
    #[serde(default)]
    pub badge_key: Option<String>,
    #[serde(default)]
    pub next_lesson: Option<LessonId>,
}

impl LessonBody {
    fn into_draft(self) -> Result<LessonDraft, TierError> {
        let tiers = self.tiers.into_tier_set()?;
        Ok(LessonDraft {
            title: self.title,
            description: self.description,
            artist: self.artist,
            topic: self.topic,
            difficulty: self.difficulty,
            published: self.published,
            tiers,
        })
    }
}

impl TiersBody {
    fn into_tier_set(self) -> Result<TierSet, TierError> {
        let options = self
            .multiple_choice
            .options
            .into_iter()
            .map(|choice| ChoiceOption::new(choice.id, choice.text, choice.is_correct))
            .collect();

        Ok(TierSet::new(
            IntroTier::new(self.intro.heading, self.intro.body, self.intro.media_url)?,
            StepsTier::new(self.steps.steps)?,
            MultipleChoiceTier::new(
                self.multiple_choice.question,
                options,
                self.multiple_choice.xp_reward,
            )?,
            FillInBlankTier::new(
                self.fill_in_blank.question,
                self.fill_in_blank.answer,
                self.fill_in_blank.acceptable_answers,
                self.fill_in_blank.xp_reward,
            )?,
            CompletionTier::new(
                self.completion.summary,
                self.completion.bonus_xp,
                self.completion.badge_key,
                self.completion.next_lesson,
            )?,
        ))
    }
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

/// Full lesson payload, tier content included.
#[derive(Debug, Serialize)]
pub struct LessonResponse {
    pub id: LessonId,
    pub title: String,
    pub description: Option<String>,
    pub artist: String,
    pub topic: String,
    pub difficulty: u8,
    pub published: bool,
    pub tiers: Vec<TierContent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Lesson> for LessonResponse {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id(),
            title: lesson.title().to_owned(),
            description: lesson.description().map(str::to_owned),
            artist: lesson.artist().to_owned(),
            topic: lesson.topic().to_owned(),
            difficulty: lesson.difficulty().value(),
            published: lesson.is_published(),
            tiers: lesson.tiers().contents(),
            created_at: lesson.created_at(),
            updated_at: lesson.updated_at(),
        }
    }
}

/// Catalogue entry without tier content.
#[derive(Debug, Serialize)]
pub struct LessonListItem {
    pub id: LessonId,
    pub title: String,
    pub artist: String,
    pub topic: String,
    pub difficulty: u8,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&Lesson> for LessonListItem {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id(),
            title: lesson.title().to_owned(),
            artist: lesson.artist().to_owned(),
            topic: lesson.topic().to_owned(),
            difficulty: lesson.difficulty().value(),
            published: lesson.is_published(),
            updated_at: lesson.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: LessonId,
}

/// Query parameters for the lesson list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// With `published=true`, drafts are skipped.
    #[serde(default)]
    pub published: bool,
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

/// GET /api/lessons
pub async fn list_lessons(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LessonListItem>>, ApiError> {
    let lessons = state.lessons.list_lessons(query.published).await?;
    Ok(Json(lessons.iter().map(LessonListItem::from).collect()))
}

/// POST /api/lessons
pub async fn create_lesson(
    State(state): State<AppState>,
    Json(body): Json<LessonBody>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let draft = body.into_draft()?;
    let id = state.lessons.create_lesson(draft).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/lessons/:id
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LessonResponse>, ApiError> {
    let id = parse_lesson_id(&id)?;
    let lesson = state.lessons.get_lesson(id).await?;
    Ok(Json(LessonResponse::from(&lesson)))
}

/// PUT /api/lessons/:id
pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LessonBody>,
) -> Result<StatusCode, ApiError> {
    let id = parse_lesson_id(&id)?;
    let draft = body.into_draft()?;
    state.lessons.update_lesson(id, draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/lessons/:id
///
/// Also removes every learner's progress in the lesson.
pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_lesson_id(&id)?;
    state.lessons.delete_lesson(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
