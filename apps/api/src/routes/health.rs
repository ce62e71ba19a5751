use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service status plus cache health (the cache degrades rather than fails,
/// so this is the only place its condition is visible).
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let cache = state.cache.health_check().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "quill-api",
        "cache": cache,
    }))
}
