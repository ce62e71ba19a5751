//! Least-squares fit of actual engagement on the raw model score.
//!
//! Pure math, no I/O: the engine feeds it (raw, actual) pairs and applies
//! policy (sample floor, R² floor, bound clamping) to the result.

use crate::models::calibration::{BIAS_MAX, BIAS_MIN, FACTOR_MAX, FACTOR_MIN};

/// Outcome of a regression over a user's feedback history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub factor: f64,
    pub bias: f64,
    pub r_squared: f64,
}

/// Applies a calibration transform to a raw score.
/// Invariant: output = clamp(raw * factor + bias, 0, 100).
pub fn apply(raw: f64, factor: f64, bias: f64) -> f64 {
    (raw * factor + bias).clamp(0.0, 100.0)
}

/// Ordinary least squares of actual on predicted. Returns `None` when there
/// are fewer than two points or the predicted scores have zero variance
/// (slope undefined) — callers keep the prior transform in that case.
pub fn fit(pairs: &[(f64, f64)]) -> Option<LinearFit> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / nf;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    for (x, y) in pairs {
        ss_xx += (x - mean_x) * (x - mean_x);
        ss_xy += (x - mean_x) * (y - mean_y);
    }

    if ss_xx == 0.0 {
        return None;
    }

    let factor = ss_xy / ss_xx;
    let bias = mean_y - factor * mean_x;

    // R² against the fitted (unclamped) line
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in pairs {
        let predicted = factor * x + bias;
        ss_res += (y - predicted) * (y - predicted);
        ss_tot += (y - mean_y) * (y - mean_y);
    }
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).max(0.0)
    };

    Some(LinearFit {
        factor,
        bias,
        r_squared,
    })
}

/// Clamps a fit into the allowed transform envelope. An out-of-range fit is
/// pulled to the nearest boundary, not discarded.
pub fn clamp_to_bounds(fit: LinearFit) -> LinearFit {
    LinearFit {
        factor: fit.factor.clamp(FACTOR_MIN, FACTOR_MAX),
        bias: fit.bias.clamp(BIAS_MIN, BIAS_MAX),
        r_squared: fit.r_squared,
    }
}
