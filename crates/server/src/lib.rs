//! HTTP surface for the Encore backend.
//!
//! A thin axum layer over the services crate: handlers translate wire
//! payloads into service calls and service errors into status codes. Lesson
//! state machines run in the learner's app; this server stores content,
//! ingests progress snapshots, and fronts question generation.

#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::Router;
use services::{
    AnalyticsService, AppServices, LessonService, ProgressService, QuestionGenService, RateLimiter,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers.
///
/// Handlers receive a clone per request; every field is a shared `Arc`
/// handle.
#[derive(Clone)]
pub struct AppState {
    pub lessons: Arc<LessonService>,
    pub progress: Arc<ProgressService>,
    pub analytics: Arc<AnalyticsService>,
    pub question_gen: Arc<QuestionGenService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Borrow the service handles out of a composition root.
    #[must_use]
    pub fn new(services: &AppServices) -> Self {
        Self {
            lessons: services.lessons(),
            progress: services.progress(),
            analytics: services.analytics(),
            question_gen: services.question_gen(),
            rate_limiter: services.rate_limiter(),
        }
    }
}

/// Build the application router.
///
/// Everything under `/api` expects JSON; learner-scoped routes additionally
/// require the `x-learner-id` header. `/health` sits outside `/api` and takes
/// no input at all.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route(
            "/api/lessons",
            get(api::list_lessons).post(api::create_lesson),
        )
        .route(
            "/api/lessons/:id",
            get(api::get_lesson)
                .put(api::update_lesson)
                .delete(api::delete_lesson),
        )
        .route("/api/progress", post(api::save_progress))
        .route("/api/progress/:lesson_id", get(api::get_progress))
        .route("/api/generate", post(api::generate_question))
        .route("/api/analytics/lessons/:id", get(api::lesson_stats))
        .route("/api/analytics/learner", get(api::learner_overview));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
