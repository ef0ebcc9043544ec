use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::setting_id::{FrameSetting, GlobalSettingId, SettingId};

/// Face bounding box in image-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// One detected face in one frame.
///
/// Detection supplies `embedding` and `bounding_box`; the remaining fields
/// are filled in stage by stage (identity, per-person setting, global
/// setting) and are `None` until their stage has run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub embedding: Vec<f32>,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_id: Option<SettingId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_setting_id: Option<GlobalSettingId>,
}

impl FaceObservation {
    pub fn new(embedding: Vec<f32>, bounding_box: BoundingBox) -> Self {
        Self {
            embedding,
            bounding_box,
            person_id: None,
            setting_id: None,
            global_setting_id: None,
        }
    }
}

/// One sampled video frame and everything known about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_path: PathBuf,
    #[serde(default)]
    pub scene_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_setting_id: Option<FrameSetting>,
}

impl Frame {
    pub fn new(frame_path: impl Into<PathBuf>, scene_number: u32) -> Self {
        Self {
            frame_path: frame_path.into(),
            scene_number,
            timestamp_seconds: None,
            caption: None,
            faces: Vec::new(),
            global_setting_id: None,
        }
    }

    pub fn with_faces(mut self, faces: Vec<FaceObservation>) -> Self {
        self.faces = faces;
        self
    }
}

/// A detected scene cut and the frames sampled from it, in time order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_seconds: Option<f64>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Scene {
    pub fn new(scene_number: u32, frames: Vec<Frame>) -> Self {
        Self {
            scene_number,
            start_seconds: None,
            end_seconds: None,
            frames,
        }
    }
}

pub fn count_frames(scenes: &[Scene]) -> usize {
    scenes.iter().map(|s| s.frames.len()).sum()
}

pub fn count_faces(scenes: &[Scene]) -> usize {
    scenes
        .iter()
        .flat_map(|s| s.frames.iter())
        .map(|f| f.faces.len())
        .sum()
}
