//! Service configuration.
//!
//! Every artifact the service depends on is resolved here: CLI flag
//! first, environment variable second, conventional default last. Nothing
//! else in the crate touches paths.

use clap::Parser;
use std::ops::RangeInclusive;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "stockcast")]
#[command(about = "Demand forecasting backend for the health commodity dashboard")]
pub struct AppConfig {
    /// Historical distribution dataset (CSV)
    #[arg(long = "data", env = "STOCKCAST_DATA", default_value = "data/historical_data.csv")]
    pub data_path: PathBuf,

    /// Exported gradient-boosted model artifact (JSON)
    #[arg(long = "model", env = "STOCKCAST_MODEL", default_value = "models/demand_gbm.json")]
    pub model_path: PathBuf,

    /// Exported ordinal encoder artifact (JSON)
    #[arg(long = "encoder", env = "STOCKCAST_ENCODER", default_value = "models/encoder.json")]
    pub encoder_path: PathBuf,

    /// County boundary file (GeoJSON feature collection)
    #[arg(
        long = "boundaries",
        env = "STOCKCAST_BOUNDARIES",
        default_value = "data/kenya_counties.geojson"
    )]
    pub boundaries_path: PathBuf,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Earliest year accepted by prediction queries
    #[arg(long, env = "STOCKCAST_MIN_YEAR", default_value_t = 2011)]
    pub min_year: i32,

    /// Latest year accepted by prediction queries
    #[arg(long, env = "STOCKCAST_MAX_YEAR", default_value_t = 2030)]
    pub max_year: i32,
}

impl AppConfig {
    /// Valid year domain for prediction inputs.
    pub fn year_range(&self) -> RangeInclusive<i32> {
        self.min_year..=self.max_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::try_parse_from(["stockcast"]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.year_range(), 2011..=2030);
        assert_eq!(config.data_path, PathBuf::from("data/historical_data.csv"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = AppConfig::try_parse_from([
            "stockcast",
            "--data",
            "/srv/data.csv",
            "--port",
            "9000",
            "--min-year",
            "2015",
        ])
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/srv/data.csv"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.year_range(), 2015..=2030);
    }
}
