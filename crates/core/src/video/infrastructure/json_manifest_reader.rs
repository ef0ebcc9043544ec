use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::shared::frame::{count_faces, count_frames, Scene};
use crate::video::domain::manifest_reader::{ManifestError, ManifestReader};

/// Top-level JSON document shared by the reader and writer.
#[derive(Serialize, Deserialize)]
pub(crate) struct ManifestDocument<S> {
    pub scenes: S,
}

/// Reads scenes and per-frame face detections from a JSON manifest.
///
/// Frames inherit the scene number of the scene they are listed under.
pub struct JsonManifestReader;

impl JsonManifestReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonManifestReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestReader for JsonManifestReader {
    fn read(&self, path: &Path) -> Result<Vec<Scene>, ManifestError> {
        let json = fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document: ManifestDocument<Vec<Scene>> =
            serde_json::from_str(&json).map_err(|e| ManifestError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut scenes = document.scenes;
        for scene in &mut scenes {
            for frame in &mut scene.frames {
                frame.scene_number = scene.scene_number;
            }
        }

        log::info!(
            "Loaded {} scenes, {} frames, {} faces from {}",
            scenes.len(),
            count_frames(&scenes),
            count_faces(&scenes),
            path.display()
        );
        Ok(scenes)
    }
}
