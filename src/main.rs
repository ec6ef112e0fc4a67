//! Stockcast - demand forecasting backend for the health commodity
//! dashboard.
//!
//! Startup order matters: the historical dataset is mandatory (every page
//! reads it), while the model, encoder, and boundary artifacts degrade
//! gracefully, a failed load disables only the routes that depend on it.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockcast_backend::api::{self, AppState};
use stockcast_backend::config::AppConfig;
use stockcast_backend::geo;
use stockcast_backend::model::{GradientBoostedModel, OrdinalEncoder};
use stockcast_backend::predict::Predictor;
use stockcast_backend::store::loader;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockcast_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::parse();

    let (store, report) = loader::load_csv(&config.data_path)
        .context("loading the historical dataset; the service cannot start without it")?;
    info!(
        observations = report.loaded,
        dropped_periods = report.dropped_malformed_period,
        dropped_values = report.dropped_invalid_value,
        merged = report.merged_duplicates,
        "store ready"
    );

    let predictor = load_predictor(&config);
    if predictor.is_none() {
        warn!("prediction routes disabled until valid model artifacts are supplied");
    }

    let boundaries = match geo::load_boundaries(&config.boundaries_path) {
        Ok(doc) => Some(Arc::new(doc)),
        Err(e) => {
            error!("boundary artifact unavailable, map route disabled: {}", e);
            None
        }
    };

    let state = Arc::new(AppState {
        store: Arc::new(store),
        predictor,
        boundaries,
    });
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.context("binding listen address")?;
    info!("stockcast backend listening on {}", addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Load both model artifacts; either failing leaves prediction disabled.
fn load_predictor(config: &AppConfig) -> Option<Arc<Predictor>> {
    let model = match GradientBoostedModel::load(&config.model_path) {
        Ok(model) => model,
        Err(e) => {
            error!("model artifact unavailable: {}", e);
            return None;
        }
    };
    let encoder = match OrdinalEncoder::load(&config.encoder_path) {
        Ok(encoder) => encoder,
        Err(e) => {
            error!("encoder artifact unavailable: {}", e);
            return None;
        }
    };
    info!(
        features = model.feature_names.len(),
        trees = model.trees.len(),
        encoded_columns = encoder.columns.len(),
        "model artifacts loaded"
    );
    Some(Arc::new(
        Predictor::new(Arc::new(model), Arc::new(encoder))
            .with_year_range(config.year_range()),
    ))
}
