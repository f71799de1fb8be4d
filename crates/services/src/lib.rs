#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod app_services;
pub mod error;
pub mod generation;
pub mod lesson_service;
pub mod progress_service;
pub mod rate_limit;
pub mod session;

pub use encore_core::Clock;

pub use error::{
    AnalyticsError, AppServicesError, GenerationError, LessonServiceError, RateLimitError,
    SessionError,
};

pub use analytics_service::{AnalyticsService, LearnerOverview, LessonStats, normalize_series};
pub use app_services::AppServices;
pub use generation::{
    GeneratedQuestion, QuestionGenConfig, QuestionGenService, QuestionRequest, parse_generated,
};
pub use lesson_service::LessonService;
pub use progress_service::ProgressService;
pub use rate_limit::{InMemoryRateLimitStore, RateLimitDecision, RateLimitStore, RateLimiter};
pub use session::{LessonSession, LessonSessionService};
