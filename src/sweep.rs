//! What-if sensitivity sweeps.
//!
//! A sweep re-runs the prediction query over a generated range of one lag
//! input, holding everything else fixed, and returns the response curve in
//! input order. The steeper the curve, the more the model leans on that
//! feature for the selected location and commodity.

use serde::{Deserialize, Serialize};

use crate::predict::{PredictionError, PredictionRequest, Predictor};

/// Default number of sweep points, endpoints included.
pub const DEFAULT_SWEEP_STEPS: usize = 10;

/// Upper bound of the generated range when the base value is zero.
pub const ZERO_BASE_SWEEP_MAX: f64 = 10.0;

/// The lag input being varied. Only the lag features are sweepable; the
/// calendar and location inputs are selections, not model sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepField {
    #[serde(rename = "lag_1")]
    Lag1,
    #[serde(rename = "lag_3")]
    Lag3,
    #[serde(rename = "rolling_mean_3")]
    RollingMean3,
}

impl SweepField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lag1 => "lag_1",
            Self::Lag3 => "lag_3",
            Self::RollingMean3 => "rolling_mean_3",
        }
    }

    fn get(&self, request: &PredictionRequest) -> f64 {
        match self {
            Self::Lag1 => request.lag_1,
            Self::Lag3 => request.lag_3,
            Self::RollingMean3 => request.rolling_mean_3,
        }
    }

    fn set(&self, request: &mut PredictionRequest, value: f64) {
        match self {
            Self::Lag1 => request.lag_1 = value,
            Self::Lag3 => request.lag_3 = value,
            Self::RollingMean3 => request.rolling_mean_3 = value,
        }
    }
}

/// One point of the response curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub prediction: f64,
}

/// The generated range: ±50% around the base, floored at zero; a zero base
/// falls back to `[0, ZERO_BASE_SWEEP_MAX]` so the curve is never a single
/// repeated point.
pub fn sweep_range(base: f64) -> (f64, f64) {
    let min = (base - 0.5 * base).max(0.0);
    let max = base + 0.5 * base;
    if min == max {
        (0.0, ZERO_BASE_SWEEP_MAX)
    } else {
        (min, max)
    }
}

/// `steps` evenly spaced values inclusive of both endpoints.
fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => (0..steps)
            .map(|i| {
                if i == steps - 1 {
                    max
                } else {
                    min + (max - min) * i as f64 / (steps - 1) as f64
                }
            })
            .collect(),
    }
}

/// Run the sweep: one prediction per generated value, input order
/// preserved. The base request is never mutated; each point predicts on a
/// copy with only the varied field replaced.
pub fn sweep(
    predictor: &Predictor,
    base: &PredictionRequest,
    field: SweepField,
    steps: usize,
) -> Result<Vec<SweepPoint>, PredictionError> {
    let (min, max) = sweep_range(field.get(base));
    let mut points = Vec::with_capacity(steps);
    for value in linspace(min, max, steps) {
        let mut request = base.clone();
        field.set(&mut request, value);
        let prediction = predictor.predict(&request)?;
        points.push(SweepPoint { value, prediction });
    }
    Ok(points)
}
