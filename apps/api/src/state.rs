use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CacheService;
use crate::calibration::engine::CalibrationEngine;
use crate::clients::{ContentGenerator, TextStyleAnalyzer};
use crate::config::Config;
use crate::patterns::miner::PatternMiner;
use crate::publisher::sweep::ScheduledPublisher;
use crate::scoring::calibrated::DebouncedScorer;
use crate::voice::tracker::VoiceTracker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: CacheService,
    /// Opaque AI backend behind a trait so tests can swap it out.
    pub generator: Arc<dyn ContentGenerator>,
    pub analyzer: Arc<dyn TextStyleAnalyzer>,
    pub scorer: DebouncedScorer,
    pub calibration: CalibrationEngine,
    pub miner: PatternMiner,
    pub voice: VoiceTracker,
    pub publisher: ScheduledPublisher,
    pub config: Config,
}
