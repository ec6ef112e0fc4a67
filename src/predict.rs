//! Demand prediction queries.
//!
//! One query is a single synchronous pass: validate the numeric domain,
//! derive the quarter, encode the categorical dimensions, assemble the
//! feature vector in the model artifact's training order, and run
//! single-point inference. Validation and encoding both fail before the
//! model is ever invoked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::features::LagFeatures;
use crate::model::{DemandModel, InferenceError, OrdinalEncoder, UnknownCategoryError};

/// Year domain matching the training data's coverage plus forecast horizon.
pub const DEFAULT_YEAR_RANGE: RangeInclusive<i32> = 2011..=2030;

/// One demand forecast request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub county: String,
    pub sub_county: String,
    pub ward: String,
    pub facility: String,
    pub commodity: String,
    pub month: u32,
    pub year: i32,
    pub lag_1: f64,
    pub lag_3: f64,
    pub rolling_mean_3: f64,
}

impl PredictionRequest {
    /// Calendar quarter derived from the month.
    pub fn quarter(&self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    /// Replace the lag inputs with freshly extracted ones.
    pub fn with_lags(mut self, lags: LagFeatures) -> Self {
        self.lag_1 = lags.lag_1;
        self.lag_3 = lags.lag_3;
        self.rolling_mean_3 = lags.rolling_mean_3;
        self
    }
}

/// Failure surface of a prediction query.
#[derive(Debug)]
pub enum PredictionError {
    /// Model or encoder artifacts were not loaded at startup.
    ModelUnavailable,
    /// Out-of-domain numeric input, rejected before the model is invoked.
    InvalidInput(String),
    /// Categorical value outside the encoder's fitted vocabulary.
    UnknownCategory(UnknownCategoryError),
    /// The model artifact asks for a feature this query cannot supply.
    Schema(String),
    /// The model handle itself failed.
    Inference(InferenceError),
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelUnavailable => write!(f, "model artifacts are not loaded"),
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            Self::UnknownCategory(e) => write!(f, "{e}"),
            Self::Schema(reason) => write!(f, "feature schema mismatch: {reason}"),
            Self::Inference(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PredictionError {}

impl From<UnknownCategoryError> for PredictionError {
    fn from(e: UnknownCategoryError) -> Self {
        Self::UnknownCategory(e)
    }
}

impl From<InferenceError> for PredictionError {
    fn from(e: InferenceError) -> Self {
        Self::Inference(e)
    }
}

/// Shared prediction pipeline over the loaded model and encoder handles.
pub struct Predictor {
    model: Arc<dyn DemandModel>,
    encoder: Arc<OrdinalEncoder>,
    year_range: RangeInclusive<i32>,
}

impl Predictor {
    pub fn new(model: Arc<dyn DemandModel>, encoder: Arc<OrdinalEncoder>) -> Self {
        Self {
            model,
            encoder,
            year_range: DEFAULT_YEAR_RANGE,
        }
    }

    pub fn with_year_range(mut self, year_range: RangeInclusive<i32>) -> Self {
        self.year_range = year_range;
        self
    }

    /// The encoder handle, for offering only encodable options upstream.
    pub fn encoder(&self) -> &OrdinalEncoder {
        &self.encoder
    }

    /// The model handle, for the explainability report.
    pub fn model(&self) -> &dyn DemandModel {
        self.model.as_ref()
    }

    /// Run one demand forecast.
    pub fn predict(&self, request: &PredictionRequest) -> Result<f64, PredictionError> {
        self.validate(request)?;
        let features = self.assemble_features(request)?;
        Ok(self.model.predict(&features)?)
    }

    fn validate(&self, request: &PredictionRequest) -> Result<(), PredictionError> {
        if !(1..=12).contains(&request.month) {
            return Err(PredictionError::InvalidInput(format!(
                "month {} is outside 1..=12",
                request.month
            )));
        }
        if !self.year_range.contains(&request.year) {
            return Err(PredictionError::InvalidInput(format!(
                "year {} is outside {}..={}",
                request.year,
                self.year_range.start(),
                self.year_range.end()
            )));
        }
        for (name, value) in [
            ("lag_1", request.lag_1),
            ("lag_3", request.lag_3),
            ("rolling_mean_3", request.rolling_mean_3),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PredictionError::InvalidInput(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Assemble the feature vector in the model artifact's training order.
    /// The artifact's `feature_names` is the single source of truth; a name
    /// this query cannot supply is a schema mismatch, never a silent zero.
    fn assemble_features(&self, request: &PredictionRequest) -> Result<Vec<f64>, PredictionError> {
        let mut features = Vec::with_capacity(self.model.feature_names().len());
        for name in self.model.feature_names() {
            let value = match name.as_str() {
                "month" => request.month as f64,
                "year" => request.year as f64,
                "quarter" => request.quarter() as f64,
                "lag_1" => request.lag_1,
                "lag_3" => request.lag_3,
                "rolling_mean_3" => request.rolling_mean_3,
                "county_name" => self.encoder.encode("county_name", &request.county)?,
                "sub_county_name" => self.encoder.encode("sub_county_name", &request.sub_county)?,
                "ward_name" => self.encoder.encode("ward_name", &request.ward)?,
                "facility_name" => self.encoder.encode("facility_name", &request.facility)?,
                "dataelement_name" => self.encoder.encode("dataelement_name", &request.commodity)?,
                other => {
                    return Err(PredictionError::Schema(format!(
                        "model expects unknown feature '{other}'"
                    )))
                }
            };
            features.push(value);
        }
        Ok(features)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub model: prediction is Σ (i+1)·xᵢ, so both the supplied values
    /// and their order show up in the output. Counts inference calls.
    pub struct WeightedSumModel {
        names: Vec<String>,
        importances: Vec<f64>,
        pub calls: AtomicUsize,
    }

    impl WeightedSumModel {
        pub fn with_names(names: &[&str]) -> Self {
            let n = names.len();
            Self {
                names: names.iter().map(|s| s.to_string()).collect(),
                importances: vec![1.0 / n as f64; n],
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DemandModel for WeightedSumModel {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn feature_importances(&self) -> &[f64] {
            &self.importances
        }

        fn predict(&self, features: &[f64]) -> Result<f64, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(features
                .iter()
                .enumerate()
                .map(|(i, x)| (i + 1) as f64 * x)
                .sum())
        }
    }

    pub fn sample_request() -> PredictionRequest {
        PredictionRequest {
            county: "Nairobi".to_string(),
            sub_county: "Westlands".to_string(),
            ward: "Parklands".to_string(),
            facility: "Aga Khan".to_string(),
            commodity: "Male Condoms".to_string(),
            month: 4,
            year: 2024,
            lag_1: 30.0,
            lag_3: 28.0,
            rolling_mean_3: 29.0,
        }
    }
}
