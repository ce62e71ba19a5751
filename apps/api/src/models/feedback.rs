use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A captured metrics reading for a published post at a fixed offset after
/// publish. Immutable once written; at most one row per (content, offset).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EngagementSnapshotRow {
    pub id: Uuid,
    pub content_id: Uuid,
    pub external_post_id: String,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub impressions: i64,
    pub engagement_rate: f64,
    pub predicted_score: i32,
    pub actual_score: i32,
    pub delta: i32,
    pub offset_hours: i32,
    pub captured_at: DateTime<Utc>,
}

/// Raw platform metrics as returned by the metrics provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PostMetrics {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub impressions: i64,
}
