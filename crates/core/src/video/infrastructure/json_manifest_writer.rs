use std::path::Path;

use crate::shared::atomic_write::write_atomic;
use crate::shared::frame::Scene;
use crate::video::domain::manifest_reader::ManifestError;
use crate::video::domain::manifest_writer::ManifestWriter;
use crate::video::infrastructure::json_manifest_reader::ManifestDocument;

/// Writes annotated scenes as pretty-printed JSON, replacing the target
/// atomically.
pub struct JsonManifestWriter;

impl JsonManifestWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonManifestWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestWriter for JsonManifestWriter {
    fn write(&self, path: &Path, scenes: &[Scene]) -> Result<(), ManifestError> {
        let document = ManifestDocument { scenes };
        let json = serde_json::to_vec_pretty(&document).map_err(ManifestError::Serialize)?;
        write_atomic(path, &json).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
