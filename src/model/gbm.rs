//! Gradient-boosted ensemble artifact.
//!
//! The training pipeline exports the fitted regressor as a JSON artifact:
//! feature schema, global importances, and the ensemble's trees flattened
//! into node arrays. This module loads and validates that artifact and
//! walks the trees for single-point inference. Training and attribution
//! stay on the training side of the boundary.
//!
//! Prediction is `base_score + learning_rate * Σ leaf(tree, x)`, each tree
//! descending left on `x[feature] <= threshold`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifact::ArtifactLoadError;
use crate::model::{DemandModel, InferenceError};

/// Artifact schema version this build understands.
pub const GBM_ARTIFACT_VERSION: u32 = 1;

/// One node of a flattened regression tree. Internal nodes carry a feature
/// test and child indices; leaves carry only `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Index into the feature vector; `None` marks a leaf.
    #[serde(default)]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    /// Leaf output (ignored on internal nodes).
    #[serde(default)]
    pub value: f64,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.feature.is_none()
    }
}

/// One regression tree, nodes indexed from the root at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Walk to a leaf. The load-time validation guarantees child indices
    /// are in range; the step cap guards against a cyclic artifact anyway.
    fn evaluate(&self, features: &[f64]) -> Result<f64, InferenceError> {
        let mut index = 0usize;
        for _ in 0..=self.nodes.len() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                return Ok(node.value);
            }
            let feature = node.feature.unwrap_or_default();
            let go_left = features[feature] <= node.threshold;
            index = if go_left {
                node.left.unwrap_or_default()
            } else {
                node.right.unwrap_or_default()
            };
        }
        Err(InferenceError("tree walk did not reach a leaf".to_string()))
    }
}

/// The fitted gradient-boosted regressor, loaded from its exported
/// artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    pub schema_version: u32,
    pub feature_names: Vec<String>,
    pub feature_importances: Vec<f64>,
    pub base_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

impl GradientBoostedModel {
    /// Load and validate the exported model artifact.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let bytes =
            std::fs::read(path).map_err(|e| ArtifactLoadError::Io(path.to_path_buf(), e))?;
        let model: GradientBoostedModel =
            serde_json::from_slice(&bytes).map_err(|e| ArtifactLoadError::parse(path, e))?;
        model.validate().map_err(|reason| ArtifactLoadError::schema(path, reason))?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        if self.schema_version != GBM_ARTIFACT_VERSION {
            return Err(format!(
                "unsupported model schema version {} (expected {})",
                self.schema_version, GBM_ARTIFACT_VERSION
            ));
        }
        if self.feature_names.is_empty() {
            return Err("model artifact declares no features".to_string());
        }
        if self.feature_importances.len() != self.feature_names.len() {
            return Err(format!(
                "feature_importances length {} does not match feature_names length {}",
                self.feature_importances.len(),
                self.feature_names.len()
            ));
        }
        if self.trees.is_empty() {
            return Err("model artifact contains no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                if node.is_leaf() {
                    continue;
                }
                let feature = node.feature.unwrap_or_default();
                if feature >= self.feature_names.len() {
                    return Err(format!(
                        "tree {t} node {n} tests feature {feature}, out of range"
                    ));
                }
                match (node.left, node.right) {
                    (Some(left), Some(right))
                        if left < tree.nodes.len() && right < tree.nodes.len() => {}
                    _ => {
                        return Err(format!(
                            "tree {t} node {n} has missing or out-of-range children"
                        ))
                    }
                }
            }
        }
        Ok(())
    }
}

impl DemandModel for GradientBoostedModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn predict(&self, features: &[f64]) -> Result<f64, InferenceError> {
        if features.len() != self.feature_names.len() {
            return Err(InferenceError(format!(
                "feature vector has {} values, model expects {}",
                features.len(),
                self.feature_names.len()
            )));
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(features)?;
        }
        Ok(self.base_score + self.learning_rate * sum)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::tiny_model;
    use super::*;
    use std::io::Write;

    #[test]
    fn test_ensemble_evaluation_matches_hand_computation() {
        let model = tiny_model();
        // base 10 + 0.5 * (1 + 2) = 11.5 on the left branch
        assert_eq!(model.predict(&[3.0]).unwrap(), 11.5);
        // base 10 + 0.5 * (3 + 2) = 12.5 on the right branch
        assert_eq!(model.predict(&[8.0]).unwrap(), 12.5);
        // boundary goes left
        assert_eq!(model.predict(&[5.0]).unwrap(), 11.5);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let model = tiny_model();
        let a = model.predict(&[4.2]).unwrap();
        let b = model.predict(&[4.2]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_arity_mismatch_is_inference_error() {
        let model = tiny_model();
        assert!(model.predict(&[1.0, 2.0]).is_err());
        assert!(model.predict(&[]).is_err());
    }

    #[test]
    fn test_load_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_vec(&tiny_model()).unwrap();
        file.write_all(&json).unwrap();
        file.flush().unwrap();

        let model = GradientBoostedModel::load(file.path()).unwrap();
        assert_eq!(model.feature_names, vec!["x"]);
        assert_eq!(model.predict(&[3.0]).unwrap(), 11.5);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = GradientBoostedModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Io(_, _)));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut model = tiny_model();
        model.schema_version = 99;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_importances_length_mismatch_rejected() {
        let mut model = tiny_model();
        model.feature_importances.push(0.5);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_out_of_range_child_rejected() {
        let mut model = tiny_model();
        model.trees[0].nodes[0].right = Some(42);
        assert!(model.validate().is_err());
    }
}
