use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Five-dimension writing-style vector. Each dimension is bounded to [0,10];
/// `clamped` enforces the bound at every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceVector {
    pub formal: f64,
    pub bold: f64,
    pub empathetic: f64,
    pub complexity: f64,
    pub brevity: f64,
}

impl VoiceVector {
    pub fn clamped(self) -> Self {
        let c = |v: f64| v.clamp(0.0, 10.0);
        Self {
            formal: c(self.formal),
            bold: c(self.bold),
            empathetic: c(self.empathetic),
            complexity: c(self.complexity),
            brevity: c(self.brevity),
        }
    }
}

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Initial,
    Periodic,
    Manual,
    Threshold,
    Calibration,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::Initial => "initial",
            TriggerReason::Periodic => "periodic",
            TriggerReason::Manual => "manual",
            TriggerReason::Threshold => "threshold",
            TriggerReason::Calibration => "calibration",
        }
    }
}

/// Append-only per user; the latest row is the current signature.
/// Delta columns are null on the first snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoiceSignatureRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub formal: f64,
    pub bold: f64,
    pub empathetic: f64,
    pub complexity: f64,
    pub brevity: f64,
    pub primary_tone: String,
    pub confidence: f64,
    pub trigger_reason: String,
    pub sample_size: i32,
    pub delta_formal: Option<f64>,
    pub delta_bold: Option<f64>,
    pub delta_empathetic: Option<f64>,
    pub delta_complexity: Option<f64>,
    pub delta_brevity: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl VoiceSignatureRow {
    pub fn vector(&self) -> VoiceVector {
        VoiceVector {
            formal: self.formal,
            bold: self.bold,
            empathetic: self.empathetic,
            complexity: self.complexity,
            brevity: self.brevity,
        }
    }
}
