//! Engagement Feedback Collector — turns delayed platform metrics into
//! calibration fuel.
//!
//! Flow: publish → (offset hours pass) → fetch metrics → derive actual
//! score → write one immutable snapshot per (content, offset) → trigger
//! recalibration and pattern mining off the write path.
//!
//! Idempotent by construction: the (content, offset) unique key makes a
//! repeat capture a no-op, never an error.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calibration::engine::CalibrationEngine;
use crate::clients::MetricsProvider;
use crate::models::content::GeneratedContentRow;
use crate::models::feedback::PostMetrics;
use crate::patterns::miner::PatternMiner;

/// Weighted engagement rate: comments and shares count more than likes.
pub fn engagement_rate(metrics: &PostMetrics) -> f64 {
    let weighted = metrics.likes as f64 + 2.0 * metrics.comments as f64 + 3.0 * metrics.shares as f64;
    weighted / (metrics.impressions.max(1) as f64)
}

/// Maps a weighted rate onto the 0-100 predicted-score scale. Linear up to
/// the configured ceiling, saturating there — the ceiling is policy, chosen
/// so a rate of `ceiling` reads as a perfect post.
pub fn actual_score(rate: f64, ceiling: f64) -> i32 {
    if ceiling <= 0.0 {
        return 0;
    }
    ((rate / ceiling) * 100.0).clamp(0.0, 100.0).round() as i32
}

#[derive(Clone)]
pub struct FeedbackCollector {
    pool: PgPool,
    metrics: Arc<dyn MetricsProvider>,
    calibration: CalibrationEngine,
    miner: PatternMiner,
    offsets_hours: Vec<i32>,
    rate_ceiling: f64,
}

impl FeedbackCollector {
    pub fn new(
        pool: PgPool,
        metrics: Arc<dyn MetricsProvider>,
        calibration: CalibrationEngine,
        miner: PatternMiner,
        offsets_hours: Vec<i32>,
        rate_ceiling: f64,
    ) -> Self {
        Self {
            pool,
            metrics,
            calibration,
            miner,
            offsets_hours,
            rate_ceiling,
        }
    }

    /// One collection pass: finds published content whose capture offsets
    /// have come due and captures each missing snapshot.
    pub async fn run_due_captures(&self) -> Result<usize> {
        let now = Utc::now();
        let mut captured = 0;

        for &offset in &self.offsets_hours {
            let due: Vec<GeneratedContentRow> = sqlx::query_as(
                r#"
                SELECT c.* FROM generated_content c
                WHERE c.status = 'published'
                  AND c.external_post_id IS NOT NULL
                  AND c.published_at <= $1
                  AND NOT EXISTS (
                      SELECT 1 FROM engagement_snapshots s
                      WHERE s.content_id = c.id AND s.offset_hours = $2
                  )
                "#,
            )
            .bind(now - Duration::hours(offset as i64))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

            for content in due {
                match self.capture(&content, offset).await {
                    Ok(true) => captured += 1,
                    Ok(false) => {}
                    Err(e) => warn!(
                        "Feedback capture failed for content {} at {offset}h: {e:#}",
                        content.id
                    ),
                }
            }
        }

        if captured > 0 {
            info!("Captured {captured} engagement snapshot(s)");
        }
        Ok(captured)
    }

    /// Captures one snapshot. Returns false when the (content, offset) pair
    /// was already captured — a no-op, not an error.
    pub async fn capture(&self, content: &GeneratedContentRow, offset_hours: i32) -> Result<bool> {
        let post_id = content
            .external_post_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("content {} has no external post id", content.id))?;

        let metrics = self.metrics.fetch_metrics(post_id).await?;
        let rate = engagement_rate(&metrics);
        let actual = actual_score(rate, self.rate_ceiling);
        let predicted = content.calibrated_score;

        let inserted = sqlx::query(
            r#"
            INSERT INTO engagement_snapshots
                (id, content_id, external_post_id, likes, comments, shares, impressions,
                 engagement_rate, predicted_score, actual_score, delta, offset_hours, captured_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (content_id, offset_hours) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content.id)
        .bind(post_id)
        .bind(metrics.likes)
        .bind(metrics.comments)
        .bind(metrics.shares)
        .bind(metrics.impressions)
        .bind(rate)
        .bind(predicted)
        .bind(actual)
        .bind(actual - predicted)
        .bind(offset_hours)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            debug!(
                "Snapshot for content {} at {offset_hours}h already captured, skipping",
                content.id
            );
            return Ok(false);
        }

        info!(
            "Snapshot captured for content {} at {offset_hours}h: rate {:.4}, actual {} (predicted {})",
            content.id, rate, actual, predicted
        );

        // Downstream updates run off the write path; their failures are
        // logged, never surfaced as capture errors.
        let calibration = self.calibration.clone();
        let miner = self.miner.clone();
        let content = content.clone();
        tokio::spawn(async move {
            if let Err(e) = calibration.recalibrate(content.user_id).await {
                warn!("Recalibration failed for user {}: {e:#}", content.user_id);
            }
            if let Err(e) = miner.record(&content, actual).await {
                warn!("Pattern recording failed for content {}: {e:#}", content.id);
            }
        });

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(likes: i64, comments: i64, shares: i64, impressions: i64) -> PostMetrics {
        PostMetrics {
            likes,
            comments,
            shares,
            impressions,
        }
    }

    #[test]
    fn test_engagement_rate_weights_comments_and_shares() {
        // (100 + 2*10 + 3*0) / 2000 = 0.06
        let rate = engagement_rate(&metrics(100, 10, 0, 2000));
        assert!((rate - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_engagement_rate_guards_zero_impressions() {
        let rate = engagement_rate(&metrics(5, 0, 0, 0));
        assert_eq!(rate, 5.0);
    }

    #[test]
    fn test_actual_score_linear_up_to_ceiling() {
        assert_eq!(actual_score(0.06, 0.10), 60);
        assert_eq!(actual_score(0.05, 0.10), 50);
        assert_eq!(actual_score(0.0, 0.10), 0);
    }

    #[test]
    fn test_actual_score_saturates_at_ceiling() {
        assert_eq!(actual_score(0.10, 0.10), 100);
        assert_eq!(actual_score(0.37, 0.10), 100);
    }

    #[test]
    fn test_actual_score_zero_ceiling_is_safe() {
        assert_eq!(actual_score(0.06, 0.0), 0);
    }
}
