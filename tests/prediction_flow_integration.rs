//! Integration tests for the full prediction flow.
//!
//! Exercises the pipeline the way the dashboard does: load a CSV into the
//! store, derive lag features from the stored history, load model and
//! encoder artifacts from disk, predict, and sweep. Artifacts are built
//! on the fly in a temp directory; no fixtures are checked in.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use stockcast_backend::features;
use stockcast_backend::model::{GradientBoostedModel, OrdinalEncoder};
use stockcast_backend::predict::{PredictionError, PredictionRequest, Predictor};
use stockcast_backend::store::{loader, EntityKey};
use stockcast_backend::sweep::{sweep, SweepField};

const FEATURE_NAMES: [&str; 11] = [
    "month",
    "year",
    "quarter",
    "lag_1",
    "lag_3",
    "rolling_mean_3",
    "county_name",
    "sub_county_name",
    "ward_name",
    "facility_name",
    "dataelement_name",
];

/// Index of `lag_1` in the feature schema above.
const LAG_1_INDEX: usize = 3;

fn write_history_csv(dir: &tempfile::TempDir) -> PathBuf {
    let mut csv = String::from(
        "county_name,sub_county_name,ward_name,facility_name,dataelement_name,period,value\n",
    );
    // Jan-Dec 2023, values 10,12,...,32 for one facility/commodity.
    for (i, value) in (0..12).map(|i| (i, 10 + 2 * i)) {
        csv.push_str(&format!(
            "Nairobi,Westlands,Parklands,Aga Khan,Male Condoms,2023-{:02}-01,{}\n",
            i + 1,
            value
        ));
    }
    let path = dir.path().join("historical_data.csv");
    fs::write(&path, csv).unwrap();
    path
}

/// A model whose single split is on `lag_1` at 20.0, so predictions move
/// when the sweep crosses the threshold: base 10 + 0.5 * leaf, leaves 1.0
/// (lag_1 <= 20) and 3.0 (lag_1 > 20), giving 10.5 and 11.5.
fn write_model_artifact(dir: &tempfile::TempDir) -> PathBuf {
    let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    let importances = vec![1.0 / names.len() as f64; names.len()];
    let artifact = serde_json::json!({
        "schema_version": 1,
        "feature_names": names,
        "feature_importances": importances,
        "base_score": 10.0,
        "learning_rate": 0.5,
        "trees": [
            {
                "nodes": [
                    { "feature": LAG_1_INDEX, "threshold": 20.0, "left": 1, "right": 2 },
                    { "value": 1.0 },
                    { "value": 3.0 }
                ]
            }
        ]
    });
    let path = dir.path().join("demand_gbm.json");
    fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
    path
}

fn write_encoder_artifact(dir: &tempfile::TempDir) -> PathBuf {
    let artifact = serde_json::json!({
        "schema_version": 1,
        "columns": [
            "county_name",
            "sub_county_name",
            "ward_name",
            "facility_name",
            "dataelement_name"
        ],
        "categories": [
            ["Kisumu", "Nairobi"],
            ["Kisumu East", "Westlands"],
            ["Kolwa", "Parklands"],
            ["Aga Khan", "Jaramogi"],
            ["IUCD", "Male Condoms"]
        ]
    });
    let path = dir.path().join("encoder.json");
    fs::write(&path, serde_json::to_vec(&artifact).unwrap()).unwrap();
    path
}

fn build_predictor(dir: &tempfile::TempDir) -> Predictor {
    let model = GradientBoostedModel::load(&write_model_artifact(dir)).unwrap();
    let encoder = OrdinalEncoder::load(&write_encoder_artifact(dir)).unwrap();
    Predictor::new(Arc::new(model), Arc::new(encoder))
}

fn sample_key() -> EntityKey {
    EntityKey {
        county: "Nairobi".to_string(),
        sub_county: "Westlands".to_string(),
        ward: "Parklands".to_string(),
        facility: "Aga Khan".to_string(),
        commodity: "Male Condoms".to_string(),
    }
}

fn request_with_lags(lag_1: f64, lag_3: f64, rolling_mean_3: f64) -> PredictionRequest {
    PredictionRequest {
        county: "Nairobi".to_string(),
        sub_county: "Westlands".to_string(),
        ward: "Parklands".to_string(),
        facility: "Aga Khan".to_string(),
        commodity: "Male Condoms".to_string(),
        month: 4,
        year: 2024,
        lag_1,
        lag_3,
        rolling_mean_3,
    }
}

#[test]
fn store_to_lag_features_matches_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (store, report) = loader::load_csv(&write_history_csv(&dir)).unwrap();
    assert_eq!(report.loaded, 12);
    assert_eq!(report.dropped_malformed_period, 0);

    let values = store.values_for(&sample_key());
    assert_eq!(values.len(), 12);

    let lags = features::extract_default(&values);
    assert_eq!(lags.lag_1, 32.0);
    assert_eq!(lags.lag_3, 28.0);
    assert_eq!(lags.rolling_mean_3, 30.0);
}

#[test]
fn artifacts_to_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = build_predictor(&dir);

    // lag_1 above the split threshold lands on the right leaf.
    let prediction = predictor.predict(&request_with_lags(32.0, 28.0, 30.0)).unwrap();
    assert_eq!(prediction, 11.5);

    // And below it, the left leaf.
    let prediction = predictor.predict(&request_with_lags(5.0, 4.0, 4.5)).unwrap();
    assert_eq!(prediction, 10.5);
}

#[test]
fn full_pipeline_store_lags_predict() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = loader::load_csv(&write_history_csv(&dir)).unwrap();
    let predictor = build_predictor(&dir);

    let lags = features::extract_default(&store.values_for(&sample_key()));
    let request = request_with_lags(0.0, 0.0, 0.0).with_lags(lags);
    assert_eq!(predictor.predict(&request).unwrap(), 11.5);
}

#[test]
fn sweep_crosses_the_split() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = build_predictor(&dir);

    // base lag_1 = 20 sweeps [10, 30]; points at or below 20 predict 10.5,
    // above 20 predict 11.5, in input order.
    let base = request_with_lags(20.0, 18.0, 19.0);
    let points = sweep(&predictor, &base, SweepField::Lag1, 10).unwrap();
    assert_eq!(points.len(), 10);
    assert_eq!(points[0].value, 10.0);
    assert_eq!(points[9].value, 30.0);
    for point in &points {
        let expected = if point.value <= 20.0 { 10.5 } else { 11.5 };
        assert_eq!(point.prediction, expected, "at value {}", point.value);
    }
}

#[test]
fn unknown_category_is_rejected_before_inference() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = build_predictor(&dir);

    let mut request = request_with_lags(10.0, 10.0, 10.0);
    request.county = "Atlantis".to_string();
    match predictor.predict(&request) {
        Err(PredictionError::UnknownCategory(e)) => {
            assert_eq!(e.column, "county_name");
            assert_eq!(e.value, "Atlantis");
        }
        other => panic!("expected UnknownCategory, got {other:?}"),
    }
}

#[test]
fn out_of_domain_month_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = build_predictor(&dir);

    let mut request = request_with_lags(10.0, 10.0, 10.0);
    request.month = 13;
    assert!(matches!(
        predictor.predict(&request),
        Err(PredictionError::InvalidInput(_))
    ));
}

#[test]
fn missing_artifacts_surface_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(GradientBoostedModel::load(&dir.path().join("missing.json")).is_err());
    assert!(OrdinalEncoder::load(&dir.path().join("missing.json")).is_err());
}
