//! County aggregation and boundary-name aliasing for the choropleth.
//!
//! The dataset writes counties as e.g. "Nairobi County" while the boundary
//! file carries bare uppercase names, three of them spelled differently.
//! Both sides normalize to a shared uppercase form before the color-scale
//! lookup; a boundary county with no dataset rows resolves to 0 rather
//! than a gap in the map.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::artifact::ArtifactLoadError;
use crate::store::TimeSeriesStore;

/// Known spelling differences between the boundary file and the dataset,
/// applied after uppercasing the boundary name.
pub const BOUNDARY_COUNTY_REMAPS: [(&str, &str); 3] = [
    ("ELEGEYO-MARAKWET", "ELGEYO MARAKWET"),
    ("MURANG'A", "MURANGA"),
    ("THARAKA - NITHI", "THARAKA NITHI"),
];

/// Normalize a dataset county name: trim, strip a trailing " County"
/// suffix case-insensitively, uppercase.
pub fn normalize_dataset_county(name: &str) -> String {
    let trimmed = name.trim();
    let upper = trimmed.to_uppercase();
    match upper.strip_suffix(" COUNTY") {
        Some(stripped) => stripped.trim_end().to_string(),
        None => upper,
    }
}

/// Normalize a boundary-file county name: uppercase, then apply the known
/// remaps so it matches the dataset form.
pub fn remap_boundary_county(name: &str) -> String {
    let upper = name.trim().to_uppercase();
    for (boundary, dataset) in BOUNDARY_COUNTY_REMAPS {
        if upper == boundary {
            return dataset.to_string();
        }
    }
    upper
}

/// County totals in normalized form plus the color-scale domain.
#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethValues {
    /// Normalized county name → total value.
    pub values: BTreeMap<String, f64>,
    /// Color-scale minimum (0 when no data).
    pub min: f64,
    /// Color-scale maximum (100 when no data).
    pub max: f64,
}

impl ChoroplethValues {
    /// Aggregate the store per county, optionally restricted to a
    /// commodity subset.
    pub fn from_store(store: &TimeSeriesStore, commodities: Option<&[String]>) -> Self {
        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        for (county, total) in store.county_totals(commodities) {
            *values.entry(normalize_dataset_county(&county)).or_insert(0.0) += total;
        }
        let (min, max) = if values.is_empty() {
            (0.0, 100.0)
        } else {
            values.values().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
        };
        Self { values, min, max }
    }

    /// Value for a boundary-file county name; missing counties are 0.
    pub fn lookup(&self, boundary_name: &str) -> f64 {
        self.values
            .get(&remap_boundary_county(boundary_name))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Load the boundary GeoJSON as an opaque document, checking only that it
/// is a feature collection. The geometry itself is the frontend's concern.
pub fn load_boundaries(path: &Path) -> Result<serde_json::Value, ArtifactLoadError> {
    let bytes = std::fs::read(path).map_err(|e| ArtifactLoadError::Io(path.to_path_buf(), e))?;
    let doc: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| ArtifactLoadError::parse(path, e))?;
    match doc.get("features").and_then(|f| f.as_array()) {
        Some(_) => Ok(doc),
        None => Err(ArtifactLoadError::schema(
            path,
            "boundary file is not a GeoJSON feature collection",
        )),
    }
}
