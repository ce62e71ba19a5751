use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::store::{get_content, insert_draft, schedule_content, NewContent};
use crate::errors::AppError;
use crate::models::content::{GeneratedContentRow, SourceType};
use crate::scoring::local::{score_hook, Persona};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub user_id: Uuid,
    pub prompt: String,
    pub source_type: SourceType,
    pub personalization: Option<String>,
    pub persona: Option<Persona>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub content: GeneratedContentRow,
    pub local_score: i32,
    pub suggestion: String,
    pub model_suggestions: Vec<String>,
}

/// POST /api/v1/content/generate
///
/// Generate → score locally (instant) → calibrate the model's raw score →
/// persist as a draft. The calibrated score is what feedback later measures
/// the prediction against.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }

    let draft = state
        .generator
        .generate(
            &req.prompt,
            req.source_type.as_str(),
            req.personalization.as_deref(),
        )
        .await
        .map_err(|e| AppError::Generator(e.to_string()))?;

    let local = score_hook(&draft.body, req.persona);
    let calibrated = state
        .calibration
        .calibrate(req.user_id, draft.raw_hook_score)
        .await
        .map_err(AppError::Internal)?;

    let row = insert_draft(
        &state.db,
        NewContent {
            user_id: req.user_id,
            body: &draft.body,
            source_type: req.source_type,
            model: &draft.model,
            raw_score: draft.raw_hook_score,
            calibrated_score: calibrated,
        },
    )
    .await?;

    Ok(Json(GenerateResponse {
        content: row,
        local_score: local.score,
        suggestion: local.suggestion,
        model_suggestions: draft.suggestions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub user_id: Uuid,
    pub body: String,
    pub source_type: Option<SourceType>,
    pub persona: Option<Persona>,
}

/// POST /api/v1/content/draft
///
/// For user-written text: locally scored, calibrated, stored as a draft so
/// it can be scheduled like generated content.
pub async fn handle_create_draft(
    State(state): State<AppState>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<GeneratedContentRow>, AppError> {
    if req.body.trim().is_empty() {
        return Err(AppError::Validation("body must not be empty".to_string()));
    }

    let local = score_hook(&req.body, req.persona);
    let calibrated = state
        .calibration
        .calibrate(req.user_id, local.score)
        .await
        .map_err(AppError::Internal)?;

    let row = insert_draft(
        &state.db,
        NewContent {
            user_id: req.user_id,
            body: &req.body,
            source_type: req.source_type.unwrap_or(SourceType::Idea),
            model: "manual",
            raw_score: local.score,
            calibrated_score: calibrated,
        },
    )
    .await?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub content_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
}

/// POST /api/v1/content/schedule
pub async fn handle_schedule(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let row = schedule_content(&state.db, req.content_id, req.user_id, req.scheduled_at).await?;
    Ok(Json(ScheduleResponse {
        content_id: row.id,
        scheduled_at: req.scheduled_at,
        status: row.status,
    }))
}

/// POST /api/v1/content/:id/publish
///
/// Immediate publish through the same claim path the sweep uses, so a
/// concurrent sweep pickup and a publish-now can never double-post.
pub async fn handle_publish_now(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedContentRow>, AppError> {
    let row = state.publisher.publish_now(id).await?;
    Ok(Json(row))
}

/// GET /api/v1/content/:id — status polling for scheduled/failed items.
pub async fn handle_get_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedContentRow>, AppError> {
    let row = get_content(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content {id} not found")))?;
    Ok(Json(row))
}
