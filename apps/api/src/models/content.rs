use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a piece of generated content.
///
/// CRITICAL: all status changes go through `can_transition`. Handlers and the
/// publish sweep never compare status strings ad hoc — that is how illegal
/// transitions (e.g. retrying a duplicate-content failure) slip in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Scheduled => "scheduled",
            ContentStatus::Publishing => "publishing",
            ContentStatus::Published => "published",
            ContentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ContentStatus::Draft),
            "scheduled" => Some(ContentStatus::Scheduled),
            "publishing" => Some(ContentStatus::Publishing),
            "published" => Some(ContentStatus::Published),
            "failed" => Some(ContentStatus::Failed),
            _ => None,
        }
    }

    /// The allowed-transition table. `Published` is terminal. `Failed` may
    /// re-enter `Publishing` only while the retry bound has not been hit —
    /// the bound itself is checked by the caller; this table only encodes
    /// which edges exist at all.
    pub fn can_transition(&self, to: ContentStatus) -> bool {
        use ContentStatus::*;
        matches!(
            (self, to),
            (Draft, Scheduled)
                | (Draft, Publishing)
                | (Scheduled, Publishing)
                | (Scheduled, Draft)
                | (Publishing, Published)
                | (Publishing, Failed)
                | (Publishing, Scheduled)
                | (Failed, Publishing)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContentStatus::Published)
    }
}

/// Where a generation request originated in the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Idea,
    Link,
    Cv,
    DailySpark,
    Video,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Idea => "idea",
            SourceType::Link => "link",
            SourceType::Cv => "cv",
            SourceType::DailySpark => "daily_spark",
            SourceType::Video => "video",
        }
    }
}

/// One row of `generated_content`. Rows are never hard-deleted — calibration
/// needs the full prediction history, so items only move through statuses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedContentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub source_type: String,
    pub model: String,
    pub raw_score: i32,
    pub calibrated_score: i32,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub external_post_id: Option<String>,
    pub failure_reason: Option<String>,
    pub retry_count: i32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_to_publishing_allowed() {
        assert!(ContentStatus::Scheduled.can_transition(ContentStatus::Publishing));
    }

    #[test]
    fn test_published_is_terminal() {
        assert!(ContentStatus::Published.is_terminal());
        assert!(!ContentStatus::Published.can_transition(ContentStatus::Publishing));
        assert!(!ContentStatus::Published.can_transition(ContentStatus::Failed));
    }

    #[test]
    fn test_failed_can_reenter_publishing() {
        assert!(ContentStatus::Failed.can_transition(ContentStatus::Publishing));
    }

    #[test]
    fn test_scheduled_cannot_skip_to_published() {
        assert!(!ContentStatus::Scheduled.can_transition(ContentStatus::Published));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for s in [
            ContentStatus::Draft,
            ContentStatus::Scheduled,
            ContentStatus::Publishing,
            ContentStatus::Published,
            ContentStatus::Failed,
        ] {
            assert_eq!(ContentStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ContentStatus::parse("archived"), None);
    }
}
