//! Persistence for generated content. Rows are never hard-deleted; every
//! lifecycle change is a status transition validated against the central
//! transition table.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::content::{ContentStatus, GeneratedContentRow, SourceType};

pub struct NewContent<'a> {
    pub user_id: Uuid,
    pub body: &'a str,
    pub source_type: SourceType,
    pub model: &'a str,
    pub raw_score: i32,
    pub calibrated_score: i32,
}

/// Inserts a new draft.
pub async fn insert_draft(pool: &PgPool, new: NewContent<'_>) -> Result<GeneratedContentRow> {
    let row: GeneratedContentRow = sqlx::query_as(
        r#"
        INSERT INTO generated_content
            (id, user_id, body, source_type, model, raw_score, calibrated_score,
             status, retry_count, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', 0, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.body)
    .bind(new.source_type.as_str())
    .bind(new.model)
    .bind(new.raw_score)
    .bind(new.calibrated_score)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    info!("Created draft {} for user {}", row.id, row.user_id);
    Ok(row)
}

pub async fn get_content(pool: &PgPool, id: Uuid) -> Result<Option<GeneratedContentRow>> {
    Ok(
        sqlx::query_as("SELECT * FROM generated_content WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Moves a draft onto the schedule. The scheduled time must be in the
/// future; the transition must be legal from the row's current status.
pub async fn schedule_content(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    scheduled_at: DateTime<Utc>,
) -> Result<GeneratedContentRow, AppError> {
    if scheduled_at <= Utc::now() {
        return Err(AppError::Validation(
            "scheduled_at must be in the future".to_string(),
        ));
    }

    let existing = get_content(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content {id} not found")))?;
    if existing.user_id != user_id {
        return Err(AppError::NotFound(format!("Content {id} not found")));
    }

    let from = ContentStatus::parse(&existing.status)
        .ok_or_else(|| AppError::Validation(format!("Content {id} has corrupt status")))?;
    if !from.can_transition(ContentStatus::Scheduled) {
        return Err(AppError::Conflict(format!(
            "Content {id} cannot be scheduled from status '{}'",
            from.as_str()
        )));
    }

    let row: GeneratedContentRow = sqlx::query_as(
        r#"
        UPDATE generated_content
        SET status = 'scheduled', scheduled_at = $2, failure_reason = NULL, next_attempt_at = NULL
        WHERE id = $1 AND status = $3
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(scheduled_at)
    .bind(from.as_str())
    .fetch_one(pool)
    .await?;

    info!("Scheduled content {id} for {scheduled_at}");
    Ok(row)
}
