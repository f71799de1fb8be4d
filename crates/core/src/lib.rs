#![forbid(unsafe_code)]

pub mod error;
pub mod evaluator;
pub mod model;
pub mod progression;
pub mod time;

pub use error::Error;
pub use evaluator::{Evaluation, evaluate, normalize_answer};
pub use progression::{CORRECT_ANSWER_POINTS, TierProgression};
pub use time::Clock;
