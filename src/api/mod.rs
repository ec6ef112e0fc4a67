//! JSON HTTP API.
//!
//! Thin route layer over the store, predictor, and choropleth aggregation.
//! Handlers translate query/body payloads into core calls and map the
//! prediction error taxonomy onto HTTP statuses; no domain logic lives
//! here.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::explain::FeatureImportanceReport;
use crate::features::{self, LagFeatures};
use crate::geo::{ChoroplethValues, BOUNDARY_COUNTY_REMAPS};
use crate::predict::{PredictionError, PredictionRequest, Predictor};
use crate::store::{EntityKey, FilterCriteria, Observation, StoreSummary, TimeSeriesStore};
use crate::sweep::{self, SweepField, SweepPoint, DEFAULT_SWEEP_STEPS};

/// Shared, read-only application state. The store is always present; the
/// model and boundary handles are `None` when their artifacts failed to
/// load, degrading only the routes that need them.
pub struct AppState {
    pub store: Arc<TimeSeriesStore>,
    pub predictor: Option<Arc<Predictor>>,
    pub boundaries: Option<Arc<serde_json::Value>>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/summary", get(summary))
        .route("/api/options", get(options))
        .route("/api/history", get(history))
        .route("/api/predict", post(predict))
        .route("/api/sweep", post(run_sweep))
        .route("/api/importance", get(importance))
        .route("/api/choropleth", get(choropleth))
        .route("/api/boundaries", get(boundaries))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Responses =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct OptionsResponse {
    counties: Vec<String>,
    sub_counties: Vec<String>,
    wards: Vec<String>,
    facilities: Vec<String>,
    commodities: Vec<String>,
}

#[derive(Serialize)]
struct HistoryResponse {
    observations: Vec<Observation>,
    period_totals: Vec<PeriodTotal>,
    count: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct PeriodTotal {
    period: NaiveDate,
    value: f64,
}

#[derive(Serialize)]
struct PredictResponse {
    prediction: f64,
    quarter: u32,
    /// Lag inputs the model actually saw (overrides applied).
    lag_features: LagFeatures,
    /// Lag features derived from the stored history, before overrides.
    auto_lag_features: LagFeatures,
    /// Observations behind the auto-derived lags.
    history_points: usize,
}

#[derive(Serialize)]
struct SweepResponse {
    field: SweepField,
    base_value: f64,
    points: Vec<SweepPoint>,
    count: usize,
}

#[derive(Serialize)]
struct ChoroplethResponse {
    values: BTreeMap<String, f64>,
    min: f64,
    max: f64,
    boundary_remaps: Vec<(String, String)>,
}

// ===== Requests =====

#[derive(Debug, Deserialize)]
struct OptionsQuery {
    county: Option<String>,
    sub_county: Option<String>,
    ward: Option<String>,
    facility: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoroplethQuery {
    /// Comma-separated commodity subset; absent means all commodities.
    commodities: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictBody {
    county: String,
    sub_county: String,
    ward: String,
    facility: String,
    commodity: String,
    month: u32,
    year: i32,
    /// Manual overrides; omitted fields fall back to the lags derived
    /// from the stored history of the selected series.
    lag_1: Option<f64>,
    lag_3: Option<f64>,
    rolling_mean_3: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SweepBody {
    #[serde(flatten)]
    base: PredictBody,
    field: SweepField,
    steps: Option<usize>,
}

// ===== Handlers =====

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn summary(State(state): State<Arc<AppState>>) -> Json<StoreSummary> {
    Json(state.store.summary())
}

/// Cascading dropdown options: each level unlocks once its parents are
/// selected. Counties are restricted to the encoder's fitted vocabulary
/// when the model is loaded, so the UI can only select encodable values.
async fn options(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OptionsQuery>,
) -> Json<OptionsResponse> {
    let store = &state.store;

    let mut counties = store.counties();
    if let Some(predictor) = &state.predictor {
        if let Some(valid) = predictor.encoder().categories("county_name") {
            counties.retain(|county| valid.iter().any(|v| v == county));
        }
    }

    let sub_counties = match &query.county {
        Some(county) => store.sub_counties(county),
        None => Vec::new(),
    };
    let wards = match (&query.county, &query.sub_county) {
        (Some(county), Some(sub_county)) => store.wards(county, sub_county),
        _ => Vec::new(),
    };
    let facilities = match (&query.county, &query.sub_county, &query.ward) {
        (Some(county), Some(sub_county), Some(ward)) => {
            store.facilities(county, sub_county, ward)
        }
        _ => Vec::new(),
    };
    let commodities = match (&query.county, &query.sub_county, &query.ward, &query.facility) {
        (Some(county), Some(sub_county), Some(ward), Some(facility)) => {
            store.commodities(&FilterCriteria {
                county: Some(county.clone()),
                sub_county: Some(sub_county.clone()),
                ward: Some(ward.clone()),
                facility: Some(facility.clone()),
                commodity: None,
            })
        }
        _ => Vec::new(),
    };

    Json(OptionsResponse {
        counties,
        sub_counties,
        wards,
        facilities,
        commodities,
    })
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(criteria): Query<FilterCriteria>,
) -> Json<HistoryResponse> {
    let observations: Vec<Observation> = state
        .store
        .filter(&criteria)
        .into_iter()
        .cloned()
        .collect();
    let period_totals = state
        .store
        .period_totals(&criteria)
        .into_iter()
        .map(|(period, value)| PeriodTotal { period, value })
        .collect();
    let count = observations.len();
    Json(HistoryResponse {
        observations,
        period_totals,
        count,
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PredictBody>,
) -> Result<Json<PredictResponse>, ApiError> {
    let predictor = state.predictor.as_ref().ok_or(ApiError::ModelUnavailable)?;
    let (request, auto, history_points) = resolve_request(&state, &body);
    let prediction = predictor.predict(&request)?;
    Ok(Json(PredictResponse {
        prediction,
        quarter: request.quarter(),
        lag_features: LagFeatures {
            lag_1: request.lag_1,
            lag_3: request.lag_3,
            rolling_mean_3: request.rolling_mean_3,
        },
        auto_lag_features: auto,
        history_points,
    }))
}

async fn run_sweep(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SweepBody>,
) -> Result<Json<SweepResponse>, ApiError> {
    let predictor = state.predictor.as_ref().ok_or(ApiError::ModelUnavailable)?;
    let (request, _, _) = resolve_request(&state, &body.base);
    let steps = body.steps.unwrap_or(DEFAULT_SWEEP_STEPS);
    let base_value = match body.field {
        SweepField::Lag1 => request.lag_1,
        SweepField::Lag3 => request.lag_3,
        SweepField::RollingMean3 => request.rolling_mean_3,
    };
    let points = sweep::sweep(predictor, &request, body.field, steps)?;
    let count = points.len();
    Ok(Json(SweepResponse {
        field: body.field,
        base_value,
        points,
        count,
    }))
}

async fn importance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureImportanceReport>, ApiError> {
    let predictor = state.predictor.as_ref().ok_or(ApiError::ModelUnavailable)?;
    Ok(Json(FeatureImportanceReport::from_model(predictor.model())))
}

async fn choropleth(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChoroplethQuery>,
) -> Json<ChoroplethResponse> {
    let commodities: Option<Vec<String>> = query.commodities.map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });
    let values = ChoroplethValues::from_store(&state.store, commodities.as_deref());
    Json(ChoroplethResponse {
        values: values.values,
        min: values.min,
        max: values.max,
        boundary_remaps: BOUNDARY_COUNTY_REMAPS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
    })
}

async fn boundaries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let doc = state
        .boundaries
        .as_ref()
        .ok_or(ApiError::BoundariesUnavailable)?;
    Ok(Json(doc.as_ref().clone()))
}

/// Build the prediction request: derive lag features from the stored
/// history for the selected series, then apply any manual overrides.
fn resolve_request(
    state: &AppState,
    body: &PredictBody,
) -> (PredictionRequest, LagFeatures, usize) {
    let key = EntityKey {
        county: body.county.clone(),
        sub_county: body.sub_county.clone(),
        ward: body.ward.clone(),
        facility: body.facility.clone(),
        commodity: body.commodity.clone(),
    };
    let values = state.store.values_for(&key);
    let auto = features::extract_default(&values);
    let request = PredictionRequest {
        county: body.county.clone(),
        sub_county: body.sub_county.clone(),
        ward: body.ward.clone(),
        facility: body.facility.clone(),
        commodity: body.commodity.clone(),
        month: body.month,
        year: body.year,
        lag_1: body.lag_1.unwrap_or(auto.lag_1),
        lag_3: body.lag_3.unwrap_or(auto.lag_3),
        rolling_mean_3: body.rolling_mean_3.unwrap_or(auto.rolling_mean_3),
    };
    (request, auto, values.len())
}

// ===== Error Handling =====

/// API-facing failure surface; maps the core taxonomy onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    /// Model or encoder artifacts are not loaded.
    ModelUnavailable,
    /// Boundary artifact is not loaded.
    BoundariesUnavailable,
    /// Out-of-domain numeric input.
    BadRequest(String),
    /// Categorical value outside the fitted vocabulary.
    UnknownCategory { column: String, value: String },
    /// Schema mismatch or model-side failure.
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::ModelUnavailable | Self::BoundariesUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownCategory { .. } => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::ModelUnavailable => Self::ModelUnavailable,
            PredictionError::InvalidInput(reason) => Self::BadRequest(reason),
            PredictionError::UnknownCategory(e) => Self::UnknownCategory {
                column: e.column,
                value: e.value,
            },
            PredictionError::Schema(reason) => Self::Internal(reason),
            PredictionError::Inference(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::ModelUnavailable => "model artifacts are not loaded".to_string(),
            ApiError::BoundariesUnavailable => "boundary artifact is not loaded".to_string(),
            ApiError::BadRequest(reason) => reason.clone(),
            ApiError::UnknownCategory { column, value } => {
                format!("value '{value}' for '{column}' is outside the fitted vocabulary")
            }
            ApiError::Internal(reason) => {
                tracing::error!("prediction failed: {}", reason);
                "internal server error".to_string()
            }
        };
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
