//! Voice Signature Tracker — snapshot lifecycle for the five-dimension
//! writing-style vector.
//!
//! The vector itself comes from the external style analyzer; this component
//! only decides when a re-analysis is due and records the outcome as an
//! append-only sequence with per-dimension deltas.

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::voice::{TriggerReason, VoiceSignatureRow, VoiceVector};

pub const DEFAULT_EVOLUTION_THRESHOLD: i32 = 10;

/// Per-user staleness state backing `should_reanalyze`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvolutionState {
    pub user_id: Uuid,
    pub posts_since_evolution: i32,
    pub evolution_threshold: i32,
    pub evolution_enabled: bool,
}

/// Pure staleness policy: initial analysis when no snapshot exists, then
/// re-analysis once enough posts have accumulated (if enabled).
pub fn reanalysis_due(has_snapshot: bool, state: &EvolutionState) -> bool {
    if !has_snapshot {
        return true;
    }
    state.evolution_enabled && state.posts_since_evolution >= state.evolution_threshold
}

/// Per-dimension deltas vs the prior snapshot. None on the first snapshot.
pub fn deltas(prior: Option<&VoiceVector>, next: &VoiceVector) -> [Option<f64>; 5] {
    match prior {
        None => [None; 5],
        Some(p) => [
            Some(next.formal - p.formal),
            Some(next.bold - p.bold),
            Some(next.empathetic - p.empathetic),
            Some(next.complexity - p.complexity),
            Some(next.brevity - p.brevity),
        ],
    }
}

#[derive(Clone)]
pub struct VoiceTracker {
    pool: PgPool,
}

impl VoiceTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Latest snapshot for a user, if any.
    pub async fn latest(&self, user_id: Uuid) -> Result<Option<VoiceSignatureRow>> {
        Ok(sqlx::query_as(
            r#"
            SELECT * FROM voice_signatures
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn should_reanalyze(&self, user_id: Uuid) -> Result<bool> {
        let has_snapshot = self.latest(user_id).await?.is_some();
        let state = self.evolution_state(user_id).await?;
        Ok(reanalysis_due(has_snapshot, &state))
    }

    /// Counts a newly published post toward the evolution threshold.
    pub async fn note_post_published(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO voice_evolution_state (user_id, posts_since_evolution)
            VALUES ($1, 1)
            ON CONFLICT (user_id) DO UPDATE SET
                posts_since_evolution = voice_evolution_state.posts_since_evolution + 1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Appends a snapshot with deltas vs the latest prior one and resets the
    /// posts-since-evolution counter. Dimensions are clamped to [0,10].
    pub async fn record_snapshot(
        &self,
        user_id: Uuid,
        vector: VoiceVector,
        primary_tone: &str,
        confidence: f64,
        trigger: TriggerReason,
        sample_size: i32,
    ) -> Result<VoiceSignatureRow> {
        let vector = vector.clamped();
        let prior = self.latest(user_id).await?;
        let prior_vector = prior.as_ref().map(|p| p.vector());
        let d = deltas(prior_vector.as_ref(), &vector);

        let row: VoiceSignatureRow = sqlx::query_as(
            r#"
            INSERT INTO voice_signatures
                (id, user_id, formal, bold, empathetic, complexity, brevity,
                 primary_tone, confidence, trigger_reason, sample_size,
                 delta_formal, delta_bold, delta_empathetic, delta_complexity, delta_brevity,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(vector.formal)
        .bind(vector.bold)
        .bind(vector.empathetic)
        .bind(vector.complexity)
        .bind(vector.brevity)
        .bind(primary_tone)
        .bind(confidence.clamp(0.0, 1.0))
        .bind(trigger.as_str())
        .bind(sample_size)
        .bind(d[0])
        .bind(d[1])
        .bind(d[2])
        .bind(d[3])
        .bind(d[4])
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO voice_evolution_state (user_id, posts_since_evolution)
            VALUES ($1, 0)
            ON CONFLICT (user_id) DO UPDATE SET posts_since_evolution = 0
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!(
            "Voice snapshot recorded for user {user_id} (trigger: {})",
            trigger.as_str()
        );
        Ok(row)
    }

    async fn evolution_state(&self, user_id: Uuid) -> Result<EvolutionState> {
        let state: Option<EvolutionState> =
            sqlx::query_as("SELECT * FROM voice_evolution_state WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(state.unwrap_or(EvolutionState {
            user_id,
            posts_since_evolution: 0,
            evolution_threshold: DEFAULT_EVOLUTION_THRESHOLD,
            evolution_enabled: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(posts: i32, threshold: i32, enabled: bool) -> EvolutionState {
        EvolutionState {
            user_id: Uuid::new_v4(),
            posts_since_evolution: posts,
            evolution_threshold: threshold,
            evolution_enabled: enabled,
        }
    }

    fn vector(formal: f64, bold: f64) -> VoiceVector {
        VoiceVector {
            formal,
            bold,
            empathetic: 5.0,
            complexity: 5.0,
            brevity: 5.0,
        }
    }

    #[test]
    fn test_initial_analysis_always_due() {
        assert!(reanalysis_due(false, &state(0, 10, true)));
        assert!(reanalysis_due(false, &state(0, 10, false)));
    }

    #[test]
    fn test_due_at_threshold() {
        assert!(!reanalysis_due(true, &state(9, 10, true)));
        assert!(reanalysis_due(true, &state(10, 10, true)));
        assert!(reanalysis_due(true, &state(25, 10, true)));
    }

    #[test]
    fn test_disabled_evolution_never_due_after_initial() {
        assert!(!reanalysis_due(true, &state(100, 10, false)));
    }

    #[test]
    fn test_first_snapshot_has_null_deltas() {
        let d = deltas(None, &vector(5.0, 5.0));
        assert!(d.iter().all(Option::is_none));
    }

    #[test]
    fn test_deltas_are_signed_per_dimension() {
        let prior = vector(6.0, 3.0);
        let next = vector(4.5, 7.0);
        let d = deltas(Some(&prior), &next);
        assert_eq!(d[0], Some(-1.5));
        assert_eq!(d[1], Some(4.0));
        assert_eq!(d[2], Some(0.0));
    }

    #[test]
    fn test_vector_clamped_to_dimension_bounds() {
        let v = VoiceVector {
            formal: 12.0,
            bold: -3.0,
            empathetic: 10.0,
            complexity: 0.0,
            brevity: 5.5,
        }
        .clamped();
        assert_eq!(v.formal, 10.0);
        assert_eq!(v.bold, 0.0);
        assert_eq!(v.brevity, 5.5);
    }
}
