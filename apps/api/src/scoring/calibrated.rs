//! Calibrated remote scoring with debounce.
//!
//! The client fires a score request on every keystroke pause; only the last
//! request per (user, session) within the debounce window may execute. A
//! generation counter per session implements the cancel-and-restart pattern:
//! a new request bumps the counter, and any older request abandons itself
//! when it notices it is no longer current. Superseded requests return
//! `Superseded` so the caller keeps the previous valid score on screen.
//!
//! Remote failure is non-fatal: the local heuristic score is returned with
//! `source = local_fallback` and no remote suggestion.
//!
//! Session counters are evicted as their last in-flight request resolves;
//! the map never holds idle sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calibration::engine::CalibrationEngine;
use crate::clients::ContentGenerator;
use crate::scoring::local::{score_hook, Persona};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Remote,
    LocalFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibratedScore {
    pub score: i32,
    pub suggestion: String,
    pub source: ScoreSource,
}

/// Outcome of a debounced request.
#[derive(Debug, Clone)]
pub enum ScoreOutcome {
    Scored(CalibratedScore),
    /// A newer request for the same session arrived; keep the prior score.
    Superseded,
}

type SessionKey = (Uuid, String);

#[derive(Clone)]
pub struct DebouncedScorer {
    generator: Arc<dyn ContentGenerator>,
    calibration: CalibrationEngine,
    sessions: Arc<Mutex<HashMap<SessionKey, u64>>>,
    debounce: Duration,
}

impl DebouncedScorer {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        calibration: CalibrationEngine,
        debounce: Duration,
    ) -> Self {
        Self {
            generator,
            calibration,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            debounce,
        }
    }

    fn bump(&self, key: &SessionKey) -> u64 {
        let mut sessions = self.sessions.lock().expect("scorer sessions poisoned");
        let entry = sessions.entry(key.clone()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn is_current(&self, key: &SessionKey, generation: u64) -> bool {
        self.sessions
            .lock()
            .expect("scorer sessions poisoned")
            .get(key)
            .copied()
            == Some(generation)
    }

    /// Atomically checks currency and, if this request is still the latest
    /// for its session, evicts the counter. Keys only live while a request
    /// is in flight, so the map stays bounded by concurrent sessions.
    fn finish(&self, key: &SessionKey, generation: u64) -> bool {
        let mut sessions = self.sessions.lock().expect("scorer sessions poisoned");
        if sessions.get(key).copied() == Some(generation) {
            sessions.remove(key);
            true
        } else {
            false
        }
    }

    /// Scores text through the remote model and the user's calibration
    /// transform, debounced per (user, session).
    pub async fn score(
        &self,
        user_id: Uuid,
        session: &str,
        text: &str,
        persona: Option<Persona>,
    ) -> anyhow::Result<ScoreOutcome> {
        let key = (user_id, session.to_string());
        let generation = self.bump(&key);

        // Debounce window: whoever is still current afterwards executes.
        tokio::time::sleep(self.debounce).await;
        if !self.is_current(&key, generation) {
            debug!("Score request superseded during debounce (user {user_id})");
            return Ok(ScoreOutcome::Superseded);
        }

        let local = score_hook(text, persona);

        let raw = match self.generator.score(text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Remote scoring failed for user {user_id}, falling back to local: {e:#}");
                if !self.finish(&key, generation) {
                    return Ok(ScoreOutcome::Superseded);
                }
                return Ok(ScoreOutcome::Scored(CalibratedScore {
                    score: local.score,
                    suggestion: local.suggestion,
                    source: ScoreSource::LocalFallback,
                }));
            }
        };

        // A newer request may have started while the remote call ran.
        if !self.finish(&key, generation) {
            debug!("Score request superseded during remote call (user {user_id})");
            return Ok(ScoreOutcome::Superseded);
        }

        let calibrated = self.calibration.calibrate(user_id, raw).await?;
        Ok(ScoreOutcome::Scored(CalibratedScore {
            score: calibrated,
            suggestion: local.suggestion,
            source: ScoreSource::Remote,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GeneratedDraft;
    use async_trait::async_trait;

    struct FixedScoreGenerator(i32);

    #[async_trait]
    impl ContentGenerator for FixedScoreGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _source_type: &str,
            _personalization: Option<&str>,
        ) -> anyhow::Result<GeneratedDraft> {
            unimplemented!("not used in these tests")
        }

        async fn score(&self, _text: &str) -> anyhow::Result<i32> {
            Ok(self.0)
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ContentGenerator for FailingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _source_type: &str,
            _personalization: Option<&str>,
        ) -> anyhow::Result<GeneratedDraft> {
            unimplemented!("not used in these tests")
        }

        async fn score(&self, _text: &str) -> anyhow::Result<i32> {
            anyhow::bail!("model unreachable")
        }
    }

    // Generation-counter bookkeeping is testable without a database; the
    // calibration leg needs Postgres and is covered by the engine itself.

    fn scorer(generator: Arc<dyn ContentGenerator>) -> DebouncedScorer {
        DebouncedScorer {
            generator,
            calibration: CalibrationEngine::new(
                sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap(),
                5,
                0.3,
            ),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            debounce: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_request_is_superseded() {
        let s = scorer(Arc::new(FixedScoreGenerator(80)));
        let user = Uuid::new_v4();

        let first = {
            let s = s.clone();
            tokio::spawn(async move { s.score(user, "draft", "text v1", None).await })
        };
        // Let the first request enter its debounce wait, then overtake it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let key = (user, "draft".to_string());
        s.bump(&key);

        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, ScoreOutcome::Superseded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_falls_back_to_local_score() {
        let s = scorer(Arc::new(FailingGenerator));
        let user = Uuid::new_v4();

        let outcome = s
            .score(user, "draft", "Why do launches fail?\nA thought.\nMore.", None)
            .await
            .unwrap();
        match outcome {
            ScoreOutcome::Scored(result) => {
                assert_eq!(result.source, ScoreSource::LocalFallback);
                assert!((10..=100).contains(&result.score));
            }
            ScoreOutcome::Superseded => panic!("expected a fallback score"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_counter_evicted_once_resolved() {
        let s = scorer(Arc::new(FailingGenerator));
        let user = Uuid::new_v4();

        let outcome = s.score(user, "draft", "Some text?", None).await.unwrap();
        assert!(matches!(outcome, ScoreOutcome::Scored(_)));

        // Repeated edit sessions must not accumulate counter entries.
        for round in 0..20 {
            let text = format!("Edit number {round}?");
            s.score(user, "draft", &text, None).await.unwrap();
        }
        assert!(s.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_debounce_independently() {
        let s = scorer(Arc::new(FailingGenerator));
        let user = Uuid::new_v4();

        let first = {
            let s = s.clone();
            tokio::spawn(async move { s.score(user, "draft-a", "One text?", None).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        // A request on a different session must not cancel draft-a.
        let second = s.score(user, "draft-b", "Other text?", None).await.unwrap();
        assert!(matches!(second, ScoreOutcome::Scored(_)));

        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, ScoreOutcome::Scored(_)));
    }
}
