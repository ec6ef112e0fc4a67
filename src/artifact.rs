//! Artifact loading errors.
//!
//! The historical-data CSV, the fitted model, the fitted encoder, and the
//! county boundary file are all externally produced, versioned artifacts
//! resolved from configuration at startup. Any of them failing to load is
//! an [`ArtifactLoadError`]; only the data store is fatal to the process,
//! the rest degrade their dependent routes (see `main.rs`).

use std::fmt;
use std::path::{Path, PathBuf};

/// An artifact could not be loaded or failed validation.
#[derive(Debug)]
pub enum ArtifactLoadError {
    /// File missing or unreadable.
    Io(PathBuf, std::io::Error),
    /// File read but not parseable in the expected format.
    Parse(PathBuf, String),
    /// Parsed but structurally invalid (version or shape mismatch).
    Schema(PathBuf, String),
}

impl ArtifactLoadError {
    pub fn parse(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Parse(path.to_path_buf(), reason.to_string())
    }

    pub fn schema(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Schema(path.to_path_buf(), reason.to_string())
    }

    /// The artifact path the failure refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io(path, _) | Self::Parse(path, _) | Self::Schema(path, _) => path,
        }
    }
}

impl fmt::Display for ArtifactLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "failed to read artifact {}: {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "failed to parse artifact {}: {}", path.display(), e),
            Self::Schema(path, e) => {
                write!(f, "artifact {} failed validation: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ArtifactLoadError {}
