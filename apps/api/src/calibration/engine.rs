//! Calibration Engine — keeps the per-user linear correction current.
//!
//! Flow: feedback write → recalibrate(user) → least-squares over the full
//! snapshot history → policy gate (sample floor, R² floor, bound clamping)
//! → profile overwrite with prior pair pushed to history.
//!
//! A user with no profile calibrates as the identity transform. Fit
//! rejection is silent: a poor fit keeps the previous factor/bias rather
//! than degrading live predictions.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calibration::fit::{apply, clamp_to_bounds, fit};
use crate::models::calibration::CalibrationProfileRow;

#[derive(Clone)]
pub struct CalibrationEngine {
    pool: PgPool,
    min_samples: usize,
    min_r_squared: f64,
}

impl CalibrationEngine {
    pub fn new(pool: PgPool, min_samples: usize, min_r_squared: f64) -> Self {
        Self {
            pool,
            min_samples,
            min_r_squared,
        }
    }

    /// Loads a user's profile, or the identity transform if none exists yet.
    pub async fn profile(&self, user_id: Uuid) -> Result<CalibrationProfileRow> {
        let row: Option<CalibrationProfileRow> =
            sqlx::query_as("SELECT * FROM calibration_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.unwrap_or_else(|| CalibrationProfileRow::passthrough(user_id)))
    }

    /// Applies the user's current transform to a raw score.
    pub async fn calibrate(&self, user_id: Uuid, raw_score: i32) -> Result<i32> {
        let profile = self.profile(user_id).await?;
        Ok(apply(raw_score as f64, profile.factor, profile.bias).round() as i32)
    }

    /// Refits the transform from the user's full feedback history.
    ///
    /// The fit regresses actual scores on the *raw* model scores — the same
    /// domain `calibrate` applies the transform to. Fitting on the stored
    /// (already calibrated) predictions would see a near-identity line once a
    /// profile exists and erase the learned correction on the next cycle.
    ///
    /// Keeps the prior factor/bias when the history is too small, the fit is
    /// degenerate, or R² falls below the confidence floor; sample bookkeeping
    /// still advances so callers can see feedback accumulating.
    pub async fn recalibrate(&self, user_id: Uuid) -> Result<()> {
        let pairs: Vec<(f64, f64)> = sqlx::query_as::<_, (i32, i32)>(
            r#"
            SELECT c.raw_score, s.actual_score
            FROM engagement_snapshots s
            JOIN generated_content c ON c.id = s.content_id
            WHERE c.user_id = $1
            ORDER BY s.captured_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(p, a)| (p as f64, a as f64))
        .collect();

        if pairs.len() < self.min_samples {
            debug!(
                "Skipping calibration for {user_id}: {} of {} required samples",
                pairs.len(),
                self.min_samples
            );
            return Ok(());
        }

        let prior = self.profile(user_id).await?;
        let sample_size = pairs.len() as i32;

        let accepted = match fit(&pairs) {
            Some(candidate) if candidate.r_squared >= self.min_r_squared => {
                Some(clamp_to_bounds(candidate))
            }
            Some(candidate) => {
                debug!(
                    "Rejecting fit for {user_id}: R² {:.3} below floor {:.3}",
                    candidate.r_squared, self.min_r_squared
                );
                None
            }
            None => None,
        };

        let (factor, bias, r_squared) = match accepted {
            Some(f) => (f.factor, f.bias, f.r_squared),
            None => (prior.factor, prior.bias, prior.r_squared),
        };

        // Push the outgoing pair into history before overwriting.
        let mut history = match prior.history {
            serde_json::Value::Array(items) => items,
            _ => vec![],
        };
        history.push(json!({
            "factor": prior.factor,
            "bias": prior.bias,
            "replaced_at": Utc::now(),
        }));

        sqlx::query(
            r#"
            INSERT INTO calibration_profiles
                (user_id, factor, bias, sample_size, r_squared, last_calibrated_at, history)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                factor = EXCLUDED.factor,
                bias = EXCLUDED.bias,
                sample_size = EXCLUDED.sample_size,
                r_squared = EXCLUDED.r_squared,
                last_calibrated_at = EXCLUDED.last_calibrated_at,
                history = EXCLUDED.history
            "#,
        )
        .bind(user_id)
        .bind(factor)
        .bind(bias)
        .bind(sample_size)
        .bind(r_squared)
        .bind(Utc::now())
        .bind(serde_json::Value::Array(history))
        .execute(&self.pool)
        .await?;

        info!(
            "Recalibrated user {user_id}: factor {:.3}, bias {:.2}, R² {:.3}, n={}",
            factor, bias, r_squared, sample_size
        );
        Ok(())
    }
}
