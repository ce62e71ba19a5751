mod cache;
mod calibration;
mod clients;
mod config;
mod content;
mod db;
mod errors;
mod feedback;
mod models;
mod patterns;
mod publisher;
mod routes;
mod scoring;
mod state;
mod voice;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::CacheService;
use crate::calibration::engine::CalibrationEngine;
use crate::clients::generator::HttpGenerator;
use crate::clients::social::SocialClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::feedback::collector::FeedbackCollector;
use crate::patterns::miner::PatternMiner;
use crate::publisher::sweep::ScheduledPublisher;
use crate::routes::build_router;
use crate::scoring::calibrated::DebouncedScorer;
use crate::state::AppState;
use crate::voice::tracker::VoiceTracker;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("quill_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quill API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize Redis-backed cache (degrades to in-memory on outage)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache = CacheService::new(redis);
    info!("Cache service initialized");

    // External collaborators
    let generator = Arc::new(HttpGenerator::new(
        config.generator_api_url.clone(),
        config.generator_api_key.clone(),
    ));
    let social = Arc::new(SocialClient::new(
        config.social_api_base.clone(),
        config.social_api_token.clone(),
    ));
    info!("Generator and social clients initialized");

    // Core services
    let calibration = CalibrationEngine::new(
        pool.clone(),
        config.min_calibration_samples,
        config.min_calibration_r_squared,
    );
    let miner = PatternMiner::new(pool.clone());
    let voice = VoiceTracker::new(pool.clone());
    let scorer = DebouncedScorer::new(
        generator.clone(),
        calibration.clone(),
        Duration::from_millis(config.score_debounce_ms),
    );
    let publisher = ScheduledPublisher::new(
        pool.clone(),
        social.clone(),
        voice.clone(),
        config.sweep_concurrency,
        config.max_publish_retries,
        config.retry_backoff_base_secs,
    );
    let collector = FeedbackCollector::new(
        pool.clone(),
        social.clone(),
        calibration.clone(),
        miner.clone(),
        config.feedback_offsets_hours.clone(),
        config.engagement_rate_ceiling,
    );

    // Background workers: publish sweep and feedback capture
    tokio::spawn(publisher.clone().run(config.sweep_interval_secs));
    {
        let collector = collector.clone();
        let interval_secs = config.sweep_interval_secs.max(60);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = collector.run_due_captures().await {
                    error!("Feedback capture pass failed: {e:#}");
                }
            }
        });
    }
    info!("Background workers started");

    // Build app state
    let state = AppState {
        db: pool,
        cache,
        analyzer: generator.clone(),
        generator,
        scorer,
        calibration,
        miner,
        voice,
        publisher,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
