//! Fitted-model boundary.
//!
//! The regression model and the categorical encoder are produced by an
//! external training pipeline and consumed here as opaque, versioned JSON
//! artifacts. Nothing in this crate trains, refits, or mutates them; they
//! are loaded once at startup and shared read-only for the process
//! lifetime. [`DemandModel`] is the seam the prediction path talks to, so
//! tests can substitute a stub without any artifact on disk.

pub mod encoder;
pub mod gbm;

pub use encoder::{OrdinalEncoder, UnknownCategoryError};
pub use gbm::GradientBoostedModel;

use std::fmt;

/// Single-point inference failed inside the model handle.
#[derive(Debug)]
pub struct InferenceError(pub String);

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model inference failed: {}", self.0)
    }
}

impl std::error::Error for InferenceError {}

/// The fitted predictive model, seen only through its inference surface.
pub trait DemandModel: Send + Sync {
    /// Feature schema the model was trained on, in training order. Feature
    /// vectors handed to [`DemandModel::predict`] must follow this order
    /// exactly.
    fn feature_names(&self) -> &[String];

    /// Global importance per feature, parallel to
    /// [`DemandModel::feature_names`].
    fn feature_importances(&self) -> &[f64];

    /// Single-point inference over a fixed-order numeric feature vector.
    fn predict(&self, features: &[f64]) -> Result<f64, InferenceError>;
}
