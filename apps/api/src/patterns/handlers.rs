use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pattern::PatternSummary;
use crate::state::AppState;

/// Patterns change only as feedback lands, so responses are cached coarsely.
const PATTERNS_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Deserialize)]
pub struct PatternsQuery {
    pub user_id: Uuid,
    pub limit: Option<i64>,
    pub min_occurrences: Option<i32>,
}

/// GET /api/v1/patterns
pub async fn handle_get_patterns(
    State(state): State<AppState>,
    Query(params): Query<PatternsQuery>,
) -> Result<Json<Vec<PatternSummary>>, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 50);
    let floor = params
        .min_occurrences
        .unwrap_or(state.config.pattern_significance_floor);

    let cache_key = format!("patterns:{}:{limit}:{floor}", params.user_id);
    if let Some(cached) = state.cache.get(&cache_key).await {
        match serde_json::from_str(&cached) {
            Ok(patterns) => return Ok(Json(patterns)),
            Err(e) => warn!("Dropping unreadable patterns cache entry: {e}"),
        }
    }

    let patterns = state
        .miner
        .top_patterns(params.user_id, limit, floor)
        .await
        .map_err(AppError::Internal)?;

    if let Ok(serialized) = serde_json::to_string(&patterns) {
        state
            .cache
            .set(&cache_key, &serialized, PATTERNS_CACHE_TTL)
            .await;
    }
    Ok(Json(patterns))
}
