//! CSV ingest for the historical distribution dataset.
//!
//! Source rows carry the columns `county_name, sub_county_name, ward_name,
//! facility_name, dataelement_name, period, value`; anything else (such as
//! a leftover index column) is ignored. The loader is the single write
//! point for the store, so every data-quality rule lives here:
//!
//! - malformed periods coerce to dropped rows (counted, logged)
//! - negative or non-numeric values are dropped (counted, logged)
//! - duplicate (entity key, period) rows are merged by summing values,
//!   making per-key series strictly one observation per month

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::artifact::ArtifactLoadError;
use crate::store::{EntityKey, Observation, TimeSeriesStore};

/// Row shape of the source CSV. `period` and `value` stay raw strings so a
/// bad cell drops one row instead of failing the whole file.
#[derive(Debug, Deserialize)]
struct RawRow {
    county_name: String,
    sub_county_name: String,
    ward_name: String,
    facility_name: String,
    dataelement_name: String,
    period: String,
    value: String,
}

/// Ingest counters, reported once after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Observations in the finished store.
    pub loaded: usize,
    /// Rows dropped because the period did not parse.
    pub dropped_malformed_period: usize,
    /// Rows dropped because the value was non-numeric, NaN, or negative.
    pub dropped_invalid_value: usize,
    /// Rows merged into an existing (key, period) observation.
    pub merged_duplicates: usize,
}

/// Load the historical dataset from `path`.
///
/// A missing or unreadable file is an [`ArtifactLoadError`]; individual bad
/// rows are dropped and counted instead.
pub fn load_csv(path: &Path) -> Result<(TimeSeriesStore, LoadReport), ArtifactLoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        if e.is_io_error() {
            ArtifactLoadError::Io(path.to_path_buf(), io_from_csv(e))
        } else {
            ArtifactLoadError::parse(path, e)
        }
    })?;

    let mut report = LoadReport::default();
    let mut merged: HashMap<(EntityKey, NaiveDate), f64> = HashMap::new();

    for record in reader.deserialize::<RawRow>() {
        let row = record.map_err(|e| ArtifactLoadError::parse(path, e))?;

        let period = match parse_period(&row.period) {
            Some(period) => period,
            None => {
                report.dropped_malformed_period += 1;
                continue;
            }
        };

        let value = match row.value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                report.dropped_invalid_value += 1;
                continue;
            }
        };

        let key = EntityKey {
            county: row.county_name,
            sub_county: row.sub_county_name,
            ward: row.ward_name,
            facility: row.facility_name,
            commodity: row.dataelement_name,
        };

        match merged.get_mut(&(key.clone(), period)) {
            Some(total) => {
                *total += value;
                report.merged_duplicates += 1;
            }
            None => {
                merged.insert((key, period), value);
            }
        }
    }

    let observations: Vec<Observation> = merged
        .into_iter()
        .map(|((key, period), value)| Observation {
            county: key.county,
            sub_county: key.sub_county,
            ward: key.ward,
            facility: key.facility,
            commodity: key.commodity,
            period,
            value,
        })
        .collect();
    report.loaded = observations.len();

    if report.dropped_malformed_period > 0 || report.dropped_invalid_value > 0 {
        warn!(
            malformed_periods = report.dropped_malformed_period,
            invalid_values = report.dropped_invalid_value,
            "dropped unusable rows during dataset load"
        );
    }
    if report.merged_duplicates > 0 {
        info!(
            merged = report.merged_duplicates,
            "summed duplicate (key, period) rows during dataset load"
        );
    }
    info!(observations = report.loaded, path = %path.display(), "historical dataset loaded");

    Ok((TimeSeriesStore::from_observations(observations), report))
}

/// Parse a source period cell, snapping to the first day of the month.
/// Returns `None` for anything unparseable; the caller drops the row.
fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .ok()?;
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn io_from_csv(e: csv::Error) -> std::io::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::new(std::io::ErrorKind::Other, format!("{other:?}")),
    }
}
