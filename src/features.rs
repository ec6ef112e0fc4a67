//! Lag feature extraction for demand forecasting.
//!
//! The model is trained on three point-in-time features derived from the
//! trailing history of one (location, commodity) series:
//!
//! - `lag_1`: the most recent observed value
//! - `lag_3`: the value three periods back
//! - `rolling_mean_3`: the mean of the three most recent values
//!
//! Every caller (prediction defaults, what-if baselines, sweep bases) goes
//! through [`extract`] so the computation cannot drift between call sites.

use serde::{Deserialize, Serialize};

/// Number of trailing observations considered when deriving lag features.
pub const DEFAULT_LAG_WINDOW: usize = 12;

/// Point-in-time lag features for one series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LagFeatures {
    /// Most recent observed value, 0 when no history exists.
    pub lag_1: f64,
    /// Value three periods back, 0 when fewer than 3 observations exist.
    pub lag_3: f64,
    /// Mean of the three most recent values, 0 when fewer than 3 exist.
    pub rolling_mean_3: f64,
}

/// Derive lag features from a period-ascending value sequence.
///
/// Only the last `window` values are considered; a window smaller than 3
/// therefore zeroes `lag_3` and `rolling_mean_3` even for long series.
/// Empty input yields all zeroes rather than an error: "no history" is a
/// valid state the caller surfaces as manual-entry defaults.
pub fn extract(values: &[f64], window: usize) -> LagFeatures {
    let start = values.len().saturating_sub(window);
    let recent = &values[start..];

    let lag_1 = match recent.last() {
        Some(v) => *v,
        None => 0.0,
    };

    let (lag_3, rolling_mean_3) = if recent.len() >= 3 {
        let tail = &recent[recent.len() - 3..];
        (tail[0], tail.iter().sum::<f64>() / 3.0)
    } else {
        (0.0, 0.0)
    };

    LagFeatures {
        lag_1,
        lag_3,
        rolling_mean_3,
    }
}

/// [`extract`] with the default 12-period window.
pub fn extract_default(values: &[f64]) -> LagFeatures {
    extract(values, DEFAULT_LAG_WINDOW)
}
