pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview state machine
        .route("/api/v1/interviews/start", post(handlers::handle_start))
        .route(
            "/api/v1/interviews/:candidate_id/answer",
            post(handlers::handle_answer),
        )
        .route(
            "/api/v1/interviews/:candidate_id/resume",
            post(handlers::handle_resume),
        )
        .route(
            "/api/v1/interviews/:candidate_id/restart",
            post(handlers::handle_restart),
        )
        // Interviewer dashboard reads
        .route(
            "/api/v1/candidates/:id",
            get(handlers::handle_get_candidate),
        )
        .route(
            "/api/v1/candidates/:id/answers",
            get(handlers::handle_list_answers),
        )
        .with_state(state)
}
