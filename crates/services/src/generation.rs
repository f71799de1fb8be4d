use std::env;

use rand::rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use encore_core::model::{
    ChoiceOption, Difficulty, FillInBlankTier, MultipleChoiceTier, Tier, TierError,
};

use crate::error::GenerationError;

/// Choices requested from the model for a multiple-choice question.
const GENERATED_CHOICE_COUNT: usize = 4;

/// Stable option ids for generated choices, in display order.
const CHOICE_IDS: [&str; GENERATED_CHOICE_COUNT] = ["a", "b", "c", "d"];

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct QuestionGenConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl QuestionGenConfig {
    /// Reads the generation endpoint from `ENCORE_AI_*` variables.
    ///
    /// Returns `None` without an API key, which leaves the service disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("ENCORE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("ENCORE_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("ENCORE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

//
// ─── REQUEST AND RESULT ────────────────────────────────────────────────────────
//

/// What to generate a question about.
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub artist_name: String,
    pub tier: Tier,
}

/// A generated question as returned by the model, after validation.
///
/// For a multiple-choice tier `choices` holds the four options with the
/// correct answer among them; for fill-in-blank only `question` and
/// `correct_answer` matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl GeneratedQuestion {
    /// Maps the generated payload onto authored multiple-choice content,
    /// labelling the choices `a` to `d` in their current order.
    ///
    /// # Errors
    ///
    /// Returns `TierError` when the payload does not satisfy the tier rules,
    /// for example when no choice matches the correct answer.
    pub fn into_multiple_choice_tier(self, xp_reward: u32) -> Result<MultipleChoiceTier, TierError> {
        let correct = self.correct_answer;
        let options = CHOICE_IDS
            .iter()
            .zip(self.choices)
            .map(|(id, text)| {
                let is_correct = text == correct;
                ChoiceOption::new(*id, text, is_correct)
            })
            .collect();
        MultipleChoiceTier::new(self.question, options, xp_reward)
    }

    /// Maps the generated payload onto authored fill-in-blank content. The
    /// author adds acceptable variants afterwards.
    ///
    /// # Errors
    ///
    /// Returns `TierError` when the question or answer text is blank.
    pub fn into_fill_in_blank_tier(self, xp_reward: u32) -> Result<FillInBlankTier, TierError> {
        FillInBlankTier::new(self.question, self.correct_answer, Vec::new(), xp_reward)
    }
}

//
// ─── PARSING ───────────────────────────────────────────────────────────────────
//

/// Drops a surrounding ```json fence if the model added one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parses the model's reply into a `GeneratedQuestion`.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` when the reply is not the requested
/// JSON object.
pub fn parse_generated(raw: &str) -> Result<GeneratedQuestion, GenerationError> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| GenerationError::Malformed(e.to_string()))
}

fn validate_for_tier(question: &GeneratedQuestion, tier: Tier) -> Result<(), GenerationError> {
    if question.question.trim().is_empty() {
        return Err(GenerationError::Malformed("question text is empty".into()));
    }
    if question.correct_answer.trim().is_empty() {
        return Err(GenerationError::Malformed("correct answer is empty".into()));
    }
    if tier == Tier::MultipleChoice {
        if question.choices.len() != GENERATED_CHOICE_COUNT {
            return Err(GenerationError::Malformed(format!(
                "expected {GENERATED_CHOICE_COUNT} choices, got {}",
                question.choices.len()
            )));
        }
        if !question.choices.contains(&question.correct_answer) {
            return Err(GenerationError::Malformed(
                "correct answer is not among the choices".into(),
            ));
        }
    }
    Ok(())
}

fn build_prompt(request: &QuestionRequest) -> String {
    let shape = match request.tier {
        Tier::FillInBlank => {
            "a fill-in-the-blank question; \"choices\" must be an empty array"
        }
        _ => "a multiple-choice question with exactly 4 distinct choices",
    };
    format!(
        "Write one algebra practice question about {topic} at difficulty {difficulty} of 5, \
         themed around the K-pop artist {artist}. It must be {shape}. \
         Reply with a single JSON object and nothing else, using exactly these keys: \
         \"question\" (string), \"choices\" (array of strings), \
         \"correctAnswer\" (string), \"explanation\" (string). \
         For multiple choice, \"correctAnswer\" must be copied verbatim from \"choices\".",
        topic = request.topic,
        difficulty = request.difficulty,
        artist = request.artist_name,
    )
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Generates question-tier content through an OpenAI-compatible chat API.
///
/// The HTTP client is injected so callers share one pool and tests can point
/// the service at a stub endpoint. Without an API key the service stays
/// constructed but disabled.
#[derive(Clone)]
pub struct QuestionGenService {
    client: Client,
    config: Option<QuestionGenConfig>,
}

impl QuestionGenService {
    #[must_use]
    pub fn new(client: Client, config: Option<QuestionGenConfig>) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Client::new(), QuestionGenConfig::from_env())
    }

    /// A service with no upstream configured; every generation call returns
    /// `Disabled`.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Client::new(), None)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate a question for one of the question tiers.
    ///
    /// Multiple-choice results come back with the choices shuffled so the
    /// correct option is not positionally biased.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::UnsupportedTier` for non-question tiers,
    /// `Disabled` without an API key, and `Http`, `HttpStatus`,
    /// `EmptyResponse`, or `Malformed` for transport and payload failures.
    pub async fn generate_question(
        &self,
        request: &QuestionRequest,
    ) -> Result<GeneratedQuestion, GenerationError> {
        if !request.tier.is_question() {
            return Err(GenerationError::UnsupportedTier(request.tier.number()));
        }
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(request),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        let mut question = parse_generated(&content)?;
        validate_for_tier(&question, request.tier)?;
        if request.tier == Tier::MultipleChoice {
            let mut rng = rng();
            question.choices.shuffle(&mut rng);
        }
        Ok(question)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> GeneratedQuestion {
        GeneratedQuestion {
            question: "If NewJeans sells 3x albums and x = 4, how many albums?".into(),
            choices: vec!["12".into(), "7".into(), "34".into(), "1".into()],
            correct_answer: "12".into(),
            explanation: "Multiply 3 by 4.".into(),
        }
    }

    #[test]
    fn parses_plain_json() {
        let raw = r#"{"question":"2 + 2?","choices":["4","5","6","7"],"correctAnswer":"4","explanation":"Add."}"#;
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.question, "2 + 2?");
        assert_eq!(parsed.choices.len(), 4);
        assert_eq!(parsed.correct_answer, "4");
    }

    #[test]
    fn parses_code_fenced_json() {
        let raw = "```json\n{\"question\":\"2 + 2?\",\"choices\":[],\"correctAnswer\":\"4\"}\n```";
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.correct_answer, "4");
        assert!(parsed.choices.is_empty());
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn rejects_non_json_reply() {
        let err = parse_generated("Sure! Here is your question: 2 + 2?").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn validation_requires_four_choices_for_multiple_choice() {
        let mut payload = sample_payload();
        payload.choices.truncate(3);
        let err = validate_for_tier(&payload, Tier::MultipleChoice).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn validation_requires_correct_answer_among_choices() {
        let mut payload = sample_payload();
        payload.correct_answer = "99".into();
        let err = validate_for_tier(&payload, Tier::MultipleChoice).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));

        // Fill-in-blank has no choice list to match against.
        validate_for_tier(&payload, Tier::FillInBlank).unwrap();
    }

    #[test]
    fn maps_onto_multiple_choice_tier() {
        let tier = sample_payload().into_multiple_choice_tier(10).unwrap();
        assert_eq!(tier.xp_reward(), 10);
        assert_eq!(tier.options().len(), 4);

        let correct: Vec<_> = tier.options().iter().filter(|o| o.is_correct).collect();
        assert_eq!(correct.len(), 1);
        assert_eq!(correct[0].text, "12");
        assert_eq!(tier.options()[0].id, "a");
        assert_eq!(tier.options()[3].id, "d");
    }

    #[test]
    fn maps_onto_fill_in_blank_tier() {
        let payload = GeneratedQuestion {
            question: "BTS has ___ members.".into(),
            choices: Vec::new(),
            correct_answer: "seven".into(),
            explanation: String::new(),
        };
        let tier = payload.into_fill_in_blank_tier(15).unwrap();
        assert_eq!(tier.answer(), "seven");
        assert_eq!(tier.xp_reward(), 15);
        assert!(tier.acceptable_answers().is_empty());
    }

    #[test]
    fn mapping_without_a_matching_choice_fails() {
        let mut payload = sample_payload();
        payload.correct_answer = "99".into();
        let err = payload.into_multiple_choice_tier(10).unwrap_err();
        assert!(matches!(err, TierError::CorrectCountMismatch(0)));
    }

    #[tokio::test]
    async fn disabled_service_returns_typed_error() {
        let service = QuestionGenService::new(Client::new(), None);
        let request = QuestionRequest {
            topic: "linear-equations".into(),
            difficulty: Difficulty::new(2).unwrap(),
            artist_name: "NewJeans".into(),
            tier: Tier::MultipleChoice,
        };
        let err = service.generate_question(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::Disabled));
    }

    #[tokio::test]
    async fn non_question_tier_is_rejected_before_any_call() {
        let service = QuestionGenService::new(Client::new(), None);
        let request = QuestionRequest {
            topic: "fractions".into(),
            difficulty: Difficulty::new(3).unwrap(),
            artist_name: "BTS".into(),
            tier: Tier::Intro,
        };
        let err = service.generate_question(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::UnsupportedTier(1)));
    }

    #[test]
    fn prompt_names_topic_artist_and_difficulty() {
        let request = QuestionRequest {
            topic: "percentages".into(),
            difficulty: Difficulty::new(4).unwrap(),
            artist_name: "BLACKPINK".into(),
            tier: Tier::FillInBlank,
        };
        let prompt = build_prompt(&request);
        assert!(prompt.contains("percentages"));
        assert!(prompt.contains("BLACKPINK"));
        assert!(prompt.contains("difficulty 4"));
        assert!(prompt.contains("fill-in-the-blank"));
    }
}
