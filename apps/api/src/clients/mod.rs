//! External collaborators, held behind object-safe traits so handlers and
//! background jobs never bind to a concrete vendor. `AppState` carries each
//! as `Arc<dyn …>`; tests swap in mocks.

pub mod generator;
pub mod social;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PublishError;
use crate::models::feedback::PostMetrics;
use crate::models::voice::VoiceVector;

/// Output of a generation call: the drafted text plus the model's own
/// uncalibrated hook score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDraft {
    pub body: String,
    pub raw_hook_score: i32,
    pub suggestions: Vec<String>,
    pub model: String,
}

/// Opaque AI backend. `score` is the remote leg of calibrated scoring;
/// `generate` produces a full draft.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        source_type: &str,
        personalization: Option<&str>,
    ) -> anyhow::Result<GeneratedDraft>;

    async fn score(&self, text: &str) -> anyhow::Result<i32>;
}

/// Receipt for a successful external publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub external_post_id: String,
}

/// The social platform's publish endpoint. Failures come back classified so
/// the sweep can decide retry vs terminal without parsing vendor messages.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    async fn publish(&self, body: &str) -> Result<PublishReceipt, PublishError>;
}

/// Read-side of the social platform: current metrics for a published post.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch_metrics(&self, external_post_id: &str) -> anyhow::Result<PostMetrics>;
}

/// External text-style analysis. Produces the five-dimension voice vector;
/// the tracker only manages snapshot lifecycle around it.
#[async_trait]
pub trait TextStyleAnalyzer: Send + Sync {
    async fn analyze(&self, samples: &[String]) -> anyhow::Result<VoiceVector>;
}
