use crate::model::TierContent;

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// Outcome of evaluating one submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: bool,
    pub reward_xp: u32,
}

impl Evaluation {
    /// A wrong answer: no reward.
    #[must_use]
    pub fn incorrect() -> Self {
        Self {
            correct: false,
            reward_xp: 0,
        }
    }
}

/// Normalizes a free-text answer for comparison.
///
/// Lowercases and strips every whitespace character, not just the ends, so
/// `" X  + 1 "` and `"x+1"` compare equal.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Evaluates a submission against one tier's content.
///
/// Total over its inputs: non-question tiers, unknown option ids, and blank
/// submissions all come back as incorrect rather than erroring, so a
/// misbehaving caller can never crash an answer check.
#[must_use]
pub fn evaluate(content: &TierContent, submission: &str) -> Evaluation {
    match content {
        TierContent::MultipleChoice(mc) => {
            let correct = mc.option(submission).is_some_and(|o| o.is_correct);
            Evaluation {
                correct,
                reward_xp: if correct { mc.xp_reward() } else { 0 },
            }
        }
        TierContent::FillInBlank(fib) => {
            let submitted = normalize_answer(submission);
            if submitted.is_empty() {
                return Evaluation::incorrect();
            }
            let correct = fib.all_answers().any(|a| normalize_answer(a) == submitted);
            Evaluation {
                correct,
                reward_xp: if correct { fib.xp_reward() } else { 0 },
            }
        }
        TierContent::Intro(_) | TierContent::Steps(_) | TierContent::Completion(_) => {
            Evaluation::incorrect()
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
