use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::scoring::calibrated::{CalibratedScore, ScoreOutcome};
use crate::scoring::local::{score_hook, HookScore, Persona};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LocalScoreRequest {
    pub text: String,
    pub persona: Option<Persona>,
}

/// POST /api/v1/score/local
///
/// Synchronous, infallible: pure heuristic, no network.
pub async fn handle_score_local(Json(req): Json<LocalScoreRequest>) -> Json<HookScore> {
    Json(score_hook(&req.text, req.persona))
}

#[derive(Debug, Deserialize)]
pub struct CalibratedScoreRequest {
    pub user_id: Uuid,
    pub text: String,
    /// Editing-session key for debouncing; one in-flight request per session.
    #[serde(default = "default_session")]
    pub session: String,
    pub persona: Option<Persona>,
}

fn default_session() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibratedScoreResponse {
    Scored(CalibratedScore),
    /// A newer request for this session took over; the client keeps the
    /// previously displayed score.
    Superseded,
}

/// POST /api/v1/score/calibrated
pub async fn handle_score_calibrated(
    State(state): State<AppState>,
    Json(req): Json<CalibratedScoreRequest>,
) -> Result<Json<CalibratedScoreResponse>, AppError> {
    let outcome = state
        .scorer
        .score(req.user_id, &req.session, &req.text, req.persona)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(match outcome {
        ScoreOutcome::Scored(result) => CalibratedScoreResponse::Scored(result),
        ScoreOutcome::Superseded => CalibratedScoreResponse::Superseded,
    }))
}
