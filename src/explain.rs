//! Global feature-importance report.
//!
//! The fitted model artifact carries the ensemble's global importances;
//! this module only shapes them for display: percentage shares, sorted
//! descending. Per-prediction attribution (SHAP) lives outside this
//! service entirely.

use serde::Serialize;

use crate::model::DemandModel;

/// One feature's share of the model's global importance.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
    /// Share of total importance, in percent.
    pub percentage: f64,
}

/// All features, sorted by importance descending.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportanceReport {
    pub features: Vec<FeatureImportance>,
}

impl FeatureImportanceReport {
    pub fn from_model(model: &dyn DemandModel) -> Self {
        let importances = model.feature_importances();
        let total: f64 = importances.iter().sum();
        let mut features: Vec<FeatureImportance> = model
            .feature_names()
            .iter()
            .zip(importances)
            .map(|(name, &importance)| FeatureImportance {
                feature: name.clone(),
                importance,
                percentage: if total > 0.0 {
                    importance / total * 100.0
                } else {
                    0.0
                },
            })
            .collect();
        features.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { features }
    }

    /// The `n` most influential features.
    pub fn top(&self, n: usize) -> &[FeatureImportance] {
        &self.features[..n.min(self.features.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InferenceError;

    struct FixedImportances {
        names: Vec<String>,
        importances: Vec<f64>,
    }

    impl DemandModel for FixedImportances {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn feature_importances(&self) -> &[f64] {
            &self.importances
        }

        fn predict(&self, _features: &[f64]) -> Result<f64, InferenceError> {
            Ok(0.0)
        }
    }

    fn model(importances: &[f64]) -> FixedImportances {
        FixedImportances {
            names: (0..importances.len()).map(|i| format!("f{i}")).collect(),
            importances: importances.to_vec(),
        }
    }

    #[test]
    fn test_sorted_descending_with_percentages() {
        let report = FeatureImportanceReport::from_model(&model(&[0.1, 0.6, 0.3]));
        let order: Vec<&str> = report.features.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["f1", "f2", "f0"]);
        let total: f64 = report.features.iter().map(|f| f.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((report.features[0].percentage - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_clamps() {
        let report = FeatureImportanceReport::from_model(&model(&[0.5, 0.5]));
        assert_eq!(report.top(1).len(), 1);
        assert_eq!(report.top(10).len(), 2);
    }

    #[test]
    fn test_zero_total_yields_zero_percentages() {
        let report = FeatureImportanceReport::from_model(&model(&[0.0, 0.0]));
        assert!(report.features.iter().all(|f| f.percentage == 0.0));
    }
}
