//! HTTP API handlers for the Encore backend.

pub mod analytics;
pub mod error;
pub mod generate;
pub mod health;
pub mod ids;
pub mod lessons;
pub mod progress;

pub use analytics::{learner_overview, lesson_stats};
pub use error::ApiError;
pub use generate::generate_question;
pub use health::health_routes;
pub use lessons::{create_lesson, delete_lesson, get_lesson, list_lessons, update_lesson};
pub use progress::{get_progress, save_progress};
