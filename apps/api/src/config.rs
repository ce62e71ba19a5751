use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Required vars fail startup with context; policy knobs all carry defaults
/// so components never hardcode thresholds.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub generator_api_key: String,
    pub generator_api_url: String,
    pub social_api_base: String,
    pub social_api_token: String,
    pub port: u16,
    pub rust_log: String,

    /// Publish sweep cadence in seconds.
    pub sweep_interval_secs: u64,
    /// Max concurrent publish workers within one sweep.
    pub sweep_concurrency: usize,
    /// Transient failures are retried up to this bound, then marked failed.
    pub max_publish_retries: i32,
    /// Base delay for exponential publish backoff, in seconds.
    pub retry_backoff_base_secs: i64,

    /// Hours after publish at which engagement is captured.
    pub feedback_offsets_hours: Vec<i32>,
    /// Weighted engagement rate that maps to an actual score of 100.
    pub engagement_rate_ceiling: f64,

    /// Snapshots required before the first calibration fit.
    pub min_calibration_samples: usize,
    /// Fits below this R² keep the prior factor/bias.
    pub min_calibration_r_squared: f64,

    /// Occurrences required before a pattern appears in top_patterns.
    pub pattern_significance_floor: i32,

    /// Debounce window for calibrated scoring, in milliseconds.
    pub score_debounce_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            generator_api_key: require_env("GENERATOR_API_KEY")?,
            generator_api_url: std::env::var("GENERATOR_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            social_api_base: require_env("SOCIAL_API_BASE")?,
            social_api_token: require_env("SOCIAL_API_TOKEN")?,
            port: env_or("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", 60u64)?,
            sweep_concurrency: env_or("SWEEP_CONCURRENCY", 4usize)?,
            max_publish_retries: env_or("MAX_PUBLISH_RETRIES", 3i32)?,
            retry_backoff_base_secs: env_or("RETRY_BACKOFF_BASE_SECS", 120i64)?,
            feedback_offsets_hours: parse_offsets(
                &std::env::var("FEEDBACK_OFFSETS_HOURS").unwrap_or_else(|_| "24,48".to_string()),
            )?,
            engagement_rate_ceiling: env_or("ENGAGEMENT_RATE_CEILING", 0.10f64)?,
            min_calibration_samples: env_or("MIN_CALIBRATION_SAMPLES", 5usize)?,
            min_calibration_r_squared: env_or("MIN_CALIBRATION_R_SQUARED", 0.3f64)?,
            pattern_significance_floor: env_or("PATTERN_SIGNIFICANCE_FLOOR", 3i32)?,
            score_debounce_ms: env_or("SCORE_DEBOUNCE_MS", 500u64)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .with_context(|| format!("'{key}' must be a valid {}", std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}

fn parse_offsets(raw: &str) -> Result<Vec<i32>> {
    let mut offsets = raw
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<i32>()
                .with_context(|| format!("Invalid feedback offset '{s}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    offsets.sort_unstable();
    offsets.dedup();
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offsets_sorts_and_dedupes() {
        assert_eq!(parse_offsets("48, 24,24").unwrap(), vec![24, 48]);
    }

    #[test]
    fn test_parse_offsets_rejects_garbage() {
        assert!(parse_offsets("24,soon").is_err());
    }
}
