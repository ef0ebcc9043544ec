use std::path::Path;

use crate::shared::frame::Scene;
use crate::video::domain::manifest_reader::ManifestError;

/// Domain interface for emitting the annotated scenes.
pub trait ManifestWriter {
    fn write(&self, path: &Path, scenes: &[Scene]) -> Result<(), ManifestError>;
}
