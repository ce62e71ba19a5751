use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A running aggregate keyed by (user, pattern type, pattern value).
/// Counts only ever grow; `example_content_ids` keeps the last N examples.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SuccessPatternRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pattern_type: String,
    pub pattern_value: String,
    pub occurrence_count: i32,
    pub success_count: i32,
    pub avg_engagement_score: f64,
    pub avg_hook_score: f64,
    pub success_rate: f64,
    pub significance: f64,
    pub example_content_ids: Vec<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Shape returned to API consumers from `top_patterns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub pattern_type: String,
    pub pattern_value: String,
    pub success_rate: f64,
    pub occurrence_count: i32,
    pub significance: f64,
}
