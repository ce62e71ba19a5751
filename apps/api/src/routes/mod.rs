pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::content::handlers as content;
use crate::patterns::handlers as patterns;
use crate::scoring::handlers as scoring;
use crate::state::AppState;
use crate::voice::handlers as voice;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Scoring
        .route("/api/v1/score/local", post(scoring::handle_score_local))
        .route(
            "/api/v1/score/calibrated",
            post(scoring::handle_score_calibrated),
        )
        // Content lifecycle
        .route("/api/v1/content/generate", post(content::handle_generate))
        .route("/api/v1/content/draft", post(content::handle_create_draft))
        .route("/api/v1/content/schedule", post(content::handle_schedule))
        .route(
            "/api/v1/content/:id/publish",
            post(content::handle_publish_now),
        )
        .route("/api/v1/content/:id", get(content::handle_get_content))
        // Insights
        .route("/api/v1/patterns", get(patterns::handle_get_patterns))
        .route("/api/v1/voice/signature", get(voice::handle_get_signature))
        .route("/api/v1/voice/analyze", post(voice::handle_analyze))
        .route(
            "/api/v1/voice/snapshot",
            post(voice::handle_record_snapshot),
        )
        .with_state(state)
}
