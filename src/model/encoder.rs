//! Fitted ordinal-encoder adapter.
//!
//! The training pipeline fits an ordinal encoder over the five categorical
//! dimensions and exports the per-column category tables. A category's
//! code is its position in the fitted table, as a float, which is exactly
//! what the model saw during training. A value outside the fitted
//! vocabulary is an explicit [`UnknownCategoryError`]; it must never
//! reach the model as some made-up code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::artifact::ArtifactLoadError;

/// Artifact schema version this build understands.
pub const ENCODER_ARTIFACT_VERSION: u32 = 1;

/// A categorical value the encoder was not fitted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategoryError {
    pub column: String,
    pub value: String,
}

impl fmt::Display for UnknownCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value '{}' for '{}' is outside the encoder's fitted vocabulary",
            self.value, self.column
        )
    }
}

impl std::error::Error for UnknownCategoryError {}

/// The fitted encoding table: parallel column names and category lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    pub schema_version: u32,
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
}

impl OrdinalEncoder {
    /// Load and validate the exported encoder artifact.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let bytes =
            std::fs::read(path).map_err(|e| ArtifactLoadError::Io(path.to_path_buf(), e))?;
        let encoder: OrdinalEncoder =
            serde_json::from_slice(&bytes).map_err(|e| ArtifactLoadError::parse(path, e))?;
        encoder
            .validate()
            .map_err(|reason| ArtifactLoadError::schema(path, reason))?;
        Ok(encoder)
    }

    fn validate(&self) -> Result<(), String> {
        if self.schema_version != ENCODER_ARTIFACT_VERSION {
            return Err(format!(
                "unsupported encoder schema version {} (expected {})",
                self.schema_version, ENCODER_ARTIFACT_VERSION
            ));
        }
        if self.columns.is_empty() {
            return Err("encoder artifact declares no columns".to_string());
        }
        if self.columns.len() != self.categories.len() {
            return Err(format!(
                "categories length {} does not match columns length {}",
                self.categories.len(),
                self.columns.len()
            ));
        }
        for (column, cats) in self.columns.iter().zip(&self.categories) {
            if cats.is_empty() {
                return Err(format!("column '{column}' has an empty category table"));
            }
        }
        Ok(())
    }

    /// The fitted vocabulary for a column, `None` when the encoder was not
    /// fitted on that column.
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(&self.categories[index])
    }

    /// Encode one categorical value to its fitted numeric code.
    ///
    /// A column the encoder was not fitted on behaves as a fully-unknown
    /// vocabulary: every value for it is an [`UnknownCategoryError`].
    pub fn encode(&self, column: &str, value: &str) -> Result<f64, UnknownCategoryError> {
        let unknown = || UnknownCategoryError {
            column: column.to_string(),
            value: value.to_string(),
        };
        let cats = self.categories(column).ok_or_else(unknown)?;
        let code = cats.iter().position(|c| c == value).ok_or_else(unknown)?;
        Ok(code as f64)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn tiny_encoder() -> OrdinalEncoder {
        OrdinalEncoder {
            schema_version: ENCODER_ARTIFACT_VERSION,
            columns: vec![
                "county_name".to_string(),
                "sub_county_name".to_string(),
                "ward_name".to_string(),
                "facility_name".to_string(),
                "dataelement_name".to_string(),
            ],
            categories: vec![
                vec!["Kisumu".to_string(), "Nairobi".to_string()],
                vec!["Kisumu East".to_string(), "Westlands".to_string()],
                vec!["Kolwa".to_string(), "Parklands".to_string()],
                vec!["Aga Khan".to_string(), "Jaramogi".to_string()],
                vec!["IUCD".to_string(), "Male Condoms".to_string()],
            ],
        }
    }
}
