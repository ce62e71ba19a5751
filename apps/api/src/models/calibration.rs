use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

pub const FACTOR_MIN: f64 = 0.5;
pub const FACTOR_MAX: f64 = 1.5;
pub const BIAS_MIN: f64 = -20.0;
pub const BIAS_MAX: f64 = 20.0;

/// One row per user. `history` is an append-only JSON list of prior
/// (factor, bias) pairs, pushed before each overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalibrationProfileRow {
    pub user_id: Uuid,
    pub factor: f64,
    pub bias: f64,
    pub sample_size: i32,
    pub r_squared: f64,
    pub last_calibrated_at: Option<DateTime<Utc>>,
    pub history: Value,
}

impl CalibrationProfileRow {
    /// Identity transform used when a user has no profile yet.
    pub fn passthrough(user_id: Uuid) -> Self {
        Self {
            user_id,
            factor: 1.0,
            bias: 0.0,
            sample_size: 0,
            r_squared: 0.0,
            last_calibrated_at: None,
            history: Value::Array(vec![]),
        }
    }
}
