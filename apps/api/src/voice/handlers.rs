use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::voice::{TriggerReason, VoiceSignatureRow, VoiceVector};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SignatureResponse {
    pub signature: Option<VoiceSignatureRow>,
    pub reanalysis_due: bool,
}

/// GET /api/v1/voice/signature
pub async fn handle_get_signature(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SignatureResponse>, AppError> {
    let signature = state
        .voice
        .latest(params.user_id)
        .await
        .map_err(AppError::Internal)?;
    let reanalysis_due = state
        .voice
        .should_reanalyze(params.user_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(SignatureResponse {
        signature,
        reanalysis_due,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub user_id: Uuid,
    pub vector: VoiceVector,
    pub primary_tone: String,
    pub confidence: f64,
    pub trigger_reason: TriggerReason,
    pub sample_size: i32,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub samples: Vec<String>,
}

/// POST /api/v1/voice/analyze
///
/// Runs the external style analyzer over writing samples and returns the
/// five-dimension vector. Persisting it is a separate snapshot call, so
/// clients can preview an analysis without committing it to the history.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<VoiceVector>, AppError> {
    if req.samples.iter().all(|s| s.trim().is_empty()) {
        return Err(AppError::Validation(
            "samples must contain at least one non-empty text".to_string(),
        ));
    }
    let vector = state
        .analyzer
        .analyze(&req.samples)
        .await
        .map_err(|e| AppError::Generator(e.to_string()))?;
    Ok(Json(vector))
}

/// POST /api/v1/voice/snapshot
///
/// The vector arrives pre-computed via the analyze endpoint; this endpoint
/// only appends it to the user's signature history.
pub async fn handle_record_snapshot(
    State(state): State<AppState>,
    Json(req): Json<SnapshotRequest>,
) -> Result<Json<VoiceSignatureRow>, AppError> {
    let row = state
        .voice
        .record_snapshot(
            req.user_id,
            req.vector,
            &req.primary_tone,
            req.confidence,
            req.trigger_reason,
            req.sample_size,
        )
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::cache::CacheService;
    use crate::calibration::engine::CalibrationEngine;
    use crate::clients::{
        ContentGenerator, GeneratedDraft, PublishReceipt, SocialPublisher, TextStyleAnalyzer,
    };
    use crate::config::Config;
    use crate::errors::PublishError;
    use crate::patterns::miner::PatternMiner;
    use crate::publisher::sweep::ScheduledPublisher;
    use crate::scoring::calibrated::DebouncedScorer;
    use crate::voice::tracker::VoiceTracker;

    struct StubGenerator;

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _source_type: &str,
            _personalization: Option<&str>,
        ) -> anyhow::Result<GeneratedDraft> {
            unimplemented!("not used in these tests")
        }

        async fn score(&self, _text: &str) -> anyhow::Result<i32> {
            Ok(50)
        }
    }

    struct StubPublisher;

    #[async_trait]
    impl SocialPublisher for StubPublisher {
        async fn publish(&self, _body: &str) -> Result<PublishReceipt, PublishError> {
            unimplemented!("not used in these tests")
        }
    }

    struct FixedAnalyzer(VoiceVector);

    #[async_trait]
    impl TextStyleAnalyzer for FixedAnalyzer {
        async fn analyze(&self, _samples: &[String]) -> anyhow::Result<VoiceVector> {
            Ok(self.0.clone())
        }
    }

    fn test_state(analyzer: Arc<dyn TextStyleAnalyzer>) -> AppState {
        // Lazy pool: no query runs in these tests, so nothing ever connects.
        let pool = sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap();
        let generator: Arc<dyn ContentGenerator> = Arc::new(StubGenerator);
        let calibration = CalibrationEngine::new(pool.clone(), 5, 0.3);
        let voice = VoiceTracker::new(pool.clone());
        AppState {
            db: pool.clone(),
            cache: CacheService::in_memory(),
            analyzer,
            generator: generator.clone(),
            scorer: DebouncedScorer::new(
                generator,
                calibration.clone(),
                Duration::from_millis(1),
            ),
            calibration,
            miner: PatternMiner::new(pool.clone()),
            voice: voice.clone(),
            publisher: ScheduledPublisher::new(
                pool,
                Arc::new(StubPublisher),
                voice,
                1,
                3,
                120,
            ),
            config: Config {
                database_url: "postgres://unused/unused".to_string(),
                redis_url: "redis://unused".to_string(),
                generator_api_key: "test-key".to_string(),
                generator_api_url: "http://localhost/unused".to_string(),
                social_api_base: "http://localhost/unused".to_string(),
                social_api_token: "test-token".to_string(),
                port: 0,
                rust_log: "info".to_string(),
                sweep_interval_secs: 60,
                sweep_concurrency: 1,
                max_publish_retries: 3,
                retry_backoff_base_secs: 120,
                feedback_offsets_hours: vec![24, 48],
                engagement_rate_ceiling: 0.10,
                min_calibration_samples: 5,
                min_calibration_r_squared: 0.3,
                pattern_significance_floor: 3,
                score_debounce_ms: 1,
            },
        }
    }

    #[tokio::test]
    async fn test_analyze_returns_analyzer_vector() {
        let vector = VoiceVector {
            formal: 7.0,
            bold: 4.5,
            empathetic: 6.0,
            complexity: 5.0,
            brevity: 8.0,
        };
        let state = test_state(Arc::new(FixedAnalyzer(vector.clone())));

        let Json(out) = handle_analyze(
            State(state),
            Json(AnalyzeRequest {
                samples: vec!["I shipped a thing last week.".to_string()],
            }),
        )
        .await
        .unwrap();
        assert_eq!(out.formal, vector.formal);
        assert_eq!(out.brevity, vector.brevity);
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_samples() {
        let state = test_state(Arc::new(FixedAnalyzer(VoiceVector {
            formal: 5.0,
            bold: 5.0,
            empathetic: 5.0,
            complexity: 5.0,
            brevity: 5.0,
        })));

        let err = handle_analyze(
            State(state.clone()),
            Json(AnalyzeRequest { samples: vec![] }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = handle_analyze(
            State(state),
            Json(AnalyzeRequest {
                samples: vec!["   ".to_string()],
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
