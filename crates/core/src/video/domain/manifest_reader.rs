use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Scene;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to access manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize annotations: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Domain interface for loading scenes with their per-frame detections.
pub trait ManifestReader {
    fn read(&self, path: &Path) -> Result<Vec<Scene>, ManifestError>;
}
