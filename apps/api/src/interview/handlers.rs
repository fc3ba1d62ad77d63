use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::final_score;
use super::session::{AnswerRequest, StartRequest, TransitionOutcome};
use crate::errors::AppError;
use crate::models::answer::AnswerRecordRow;
use crate::models::candidate::CandidateRow;
use crate::state::AppState;

/// POST /api/v1/interviews/start
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let outcome = state.interview.start(req).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:candidate_id/answer
pub async fn handle_answer(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let outcome = state.interview.answer(candidate_id, req).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:candidate_id/resume
pub async fn handle_resume(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let outcome = state.interview.resume(candidate_id).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:candidate_id/restart
pub async fn handle_restart(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.interview.restart(candidate_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dashboard view of one candidate. `displayed_score` is the stored final
/// score when set, otherwise recomputed from persisted answer records.
#[derive(Debug, Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub displayed_score: f64,
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateView>, AppError> {
    let candidate = state
        .candidates
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found")))?;

    let displayed_score = if candidate.final_score > 0.0 {
        candidate.final_score
    } else {
        let overalls: Vec<u8> = state
            .candidates
            .list_answers(id)
            .await?
            .iter()
            .map(|r| r.overall.clamp(1, 10) as u8)
            .collect();
        final_score(&overalls)
    };

    Ok(Json(CandidateView {
        candidate,
        displayed_score,
    }))
}

/// GET /api/v1/candidates/:id/answers
pub async fn handle_list_answers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AnswerRecordRow>>, AppError> {
    let answers = state.candidates.list_answers(id).await?;
    Ok(Json(answers))
}
