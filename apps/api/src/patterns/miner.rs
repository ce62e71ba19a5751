//! Success Pattern Miner — per-user running aggregates of what works.
//!
//! `record` is called from the feedback path after each snapshot write and
//! upserts one row per (user, pattern type, pattern value). Counts only ever
//! grow; means are streaming; success is measured against the user's own
//! all-content average, not a global norm. All aggregate arithmetic runs
//! inside the upsert statement itself — the feedback path spawns records
//! concurrently, and a read-modify-write would lose increments.

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::content::GeneratedContentRow;
use crate::models::pattern::{PatternSummary, SuccessPatternRow};
use crate::patterns::classify::{extract_attributes, significance};

/// Example ids kept per pattern; older ones age out.
const MAX_EXAMPLES: usize = 10;

#[derive(Clone)]
pub struct PatternMiner {
    pool: PgPool,
}

impl PatternMiner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records one engagement outcome under every attribute of the content.
    pub async fn record(&self, content: &GeneratedContentRow, actual_score: i32) -> Result<()> {
        let baseline = self.user_average_score(content.user_id).await?;
        let is_success = (actual_score as f64) > baseline;

        for (pattern_type, value) in extract_attributes(&content.body, content.published_at) {
            self.upsert(
                content.user_id,
                pattern_type.as_str(),
                &value,
                content.id,
                actual_score,
                content.raw_score,
                is_success,
            )
            .await?;
        }

        debug!(
            "Recorded patterns for content {} (actual {}, baseline {:.1})",
            content.id, actual_score, baseline
        );
        Ok(())
    }

    /// The user's all-content average actual score — the personal baseline
    /// a pattern occurrence must beat to count as a success.
    async fn user_average_score(&self, user_id: Uuid) -> Result<f64> {
        let avg: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(s.actual_score)
            FROM engagement_snapshots s
            JOIN generated_content c ON c.id = s.content_id
            WHERE c.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(avg.unwrap_or(0.0))
    }

    /// One atomic observation fold. The conflict arm recomputes every
    /// aggregate from the row's own columns (streaming mean m += (x - m) / n,
    /// Wilson lower bound with z = 1.96, last-N example window), so two
    /// concurrent records for the same key both land.
    #[allow(clippy::too_many_arguments)]
    async fn upsert(
        &self,
        user_id: Uuid,
        pattern_type: &str,
        pattern_value: &str,
        content_id: Uuid,
        actual_score: i32,
        hook_score: i32,
        is_success: bool,
    ) -> Result<()> {
        // SQL fragments for the post-increment count, success tally, and
        // success rate inside the conflict arm.
        let n = "(success_patterns.occurrence_count + 1)::double precision";
        let s = "(success_patterns.success_count + $5)::double precision";
        let rate = format!("({s} / {n})");
        // Wilson lower bound: (p + z²/2n − z·sqrt((p(1−p) + z²/4n)/n)) / (1 + z²/n)
        let wilson = format!(
            "GREATEST(({rate} + 1.9208 / {n} \
               - 1.96 * sqrt(({rate} * (1 - {rate}) + 0.9604 / {n}) / {n})) \
             / (1 + 3.8416 / {n}), 0)"
        );
        let window_lower = MAX_EXAMPLES - 2;

        let query = format!(
            r#"
            INSERT INTO success_patterns
                (id, user_id, pattern_type, pattern_value, occurrence_count, success_count,
                 avg_engagement_score, avg_hook_score, success_rate, significance,
                 example_content_ids, updated_at)
            VALUES ($1, $2, $3, $4, 1, $5, $6, $7, $8, $9, ARRAY[$10]::uuid[], $11)
            ON CONFLICT (user_id, pattern_type, pattern_value) DO UPDATE SET
                occurrence_count = success_patterns.occurrence_count + 1,
                success_count = success_patterns.success_count + $5,
                avg_engagement_score = success_patterns.avg_engagement_score
                    + ($6 - success_patterns.avg_engagement_score) / {n},
                avg_hook_score = success_patterns.avg_hook_score
                    + ($7 - success_patterns.avg_hook_score) / {n},
                success_rate = {rate},
                significance = {wilson},
                example_content_ids =
                    (array_append(success_patterns.example_content_ids, $10))
                    [GREATEST(COALESCE(array_length(success_patterns.example_content_ids, 1), 0)
                              - {window_lower}, 1)
                     : COALESCE(array_length(success_patterns.example_content_ids, 1), 0) + 1],
                updated_at = $11
            "#
        );

        let success = i32::from(is_success);
        sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(pattern_type)
            .bind(pattern_value)
            .bind(success)
            .bind(actual_score as f64)
            .bind(hook_score as f64)
            .bind(success as f64)
            .bind(significance(success as i64, 1))
            .bind(content_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Highest-performing patterns for a user, excluding anything below the
    /// occurrence floor — one or two lucky posts are not a pattern.
    pub async fn top_patterns(
        &self,
        user_id: Uuid,
        limit: i64,
        min_occurrences: i32,
    ) -> Result<Vec<PatternSummary>> {
        let rows: Vec<SuccessPatternRow> = sqlx::query_as(
            r#"
            SELECT * FROM success_patterns
            WHERE user_id = $1 AND occurrence_count >= $2
            ORDER BY success_rate DESC, occurrence_count DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(min_occurrences)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PatternSummary {
                pattern_type: r.pattern_type,
                pattern_value: r.pattern_value,
                success_rate: r.success_rate,
                occurrence_count: r.occurrence_count,
                significance: r.significance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_EXAMPLES;
    use crate::patterns::classify::significance;

    // The upsert's conflict arm folds aggregates in SQL; these mirror its
    // arithmetic so a drift in the SQL constants shows up without Postgres.

    #[test]
    fn test_streaming_mean_matches_batch_mean() {
        let scores = [40.0_f64, 55.0, 70.0, 20.0, 90.0];
        let mut mean = 0.0;
        for (i, x) in scores.iter().enumerate() {
            let n = (i + 1) as f64;
            mean += (x - mean) / n;
        }
        let batch: f64 = scores.iter().sum::<f64>() / scores.len() as f64;
        assert!((mean - batch).abs() < 1e-9);
    }

    #[test]
    fn test_sql_wilson_constants_match_formula() {
        // 1.9208 = z²/2, 0.9604 = z²/4, 3.8416 = z² at z = 1.96.
        for &(s, n) in &[(1i64, 1i64), (3, 4), (6, 8), (30, 40)] {
            let nf = n as f64;
            let p = s as f64 / nf;
            let sql = ((p + 1.9208 / nf
                - 1.96 * ((p * (1.0 - p) + 0.9604 / nf) / nf).sqrt())
                / (1.0 + 3.8416 / nf))
                .max(0.0);
            assert!((sql - significance(s, n)).abs() < 1e-9, "s={s} n={n}");
        }
    }

    #[test]
    fn test_example_window_bounds_keep_most_recent() {
        // Mirrors the slice in the conflict arm:
        // lower = GREATEST(old_len - (MAX_EXAMPLES - 2), 1), upper = old_len + 1.
        let window = |old_len: i64| {
            let lower = (old_len - (MAX_EXAMPLES as i64 - 2)).max(1);
            let upper = old_len + 1;
            (upper - lower + 1, lower)
        };
        assert_eq!(window(0), (1, 1)); // first example
        assert_eq!(window(9), (10, 1)); // fills the window exactly
        assert_eq!(window(12), (10, 4)); // oldest three age out
    }
}
