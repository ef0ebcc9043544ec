//! Merges per-person setting clusters into global settings.
//!
//! Faces of different people in one frame are in one place, so their
//! per-person clusters are joined. Every frame must then resolve to at
//! most one global setting; anything else is an upstream bug and is
//! reported, never papered over.

use std::path::PathBuf;

use thiserror::Error;

use crate::setting::domain::setting_graph::{SettingComponents, SettingGraph};
use crate::shared::frame::Scene;
use crate::shared::setting_id::{FrameSetting, GlobalSettingId, SettingId};

#[derive(Error, Debug)]
pub enum SettingMergeError {
    #[error("face {face_index} in frame {frame} (person {person_id:?}) has no setting id")]
    MissingSettingId {
        frame: PathBuf,
        face_index: usize,
        person_id: Option<u32>,
    },
    #[error("setting {setting_id} in frame {frame} belongs to no global setting")]
    UnknownSettingCluster { frame: PathBuf, setting_id: SettingId },
    #[error("frame {frame} maps to more than one global setting: {}", join_ids(.global_ids))]
    InconsistentSetting {
        frame: PathBuf,
        global_ids: Vec<GlobalSettingId>,
    },
}

fn join_ids(ids: &[GlobalSettingId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the co-occurrence graph from every face's setting ID, in scan
/// order. Fails if any face has not been clustered.
pub fn build_graph(scenes: &[Scene]) -> Result<SettingGraph, SettingMergeError> {
    let mut graph = SettingGraph::new();
    for frame in scenes.iter().flat_map(|s| s.frames.iter()) {
        let mut frame_settings: Vec<SettingId> = Vec::with_capacity(frame.faces.len());
        for (face_index, face) in frame.faces.iter().enumerate() {
            let setting_id = face
                .setting_id
                .ok_or_else(|| SettingMergeError::MissingSettingId {
                    frame: frame.frame_path.clone(),
                    face_index,
                    person_id: face.person_id,
                })?;
            if !frame_settings.contains(&setting_id) {
                frame_settings.push(setting_id);
            }
        }
        graph.add_co_occurrence(&frame_settings);
    }
    Ok(graph)
}

/// Writes global setting IDs onto every face and frame.
///
/// Frames without faces get [`FrameSetting::Unknown`]. A frame whose faces
/// land in different components is rejected with
/// [`SettingMergeError::InconsistentSetting`]. Labels are only written once
/// every frame has been checked, so on error the scenes are left as they
/// were.
pub fn propagate(
    scenes: &mut [Scene],
    components: &SettingComponents,
) -> Result<(), SettingMergeError> {
    let labels = resolve_labels(scenes, components)?;

    let frames = scenes.iter_mut().flat_map(|s| s.frames.iter_mut());
    for (frame, (face_globals, frame_setting)) in frames.zip(labels) {
        for (face, global) in frame.faces.iter_mut().zip(face_globals) {
            face.global_setting_id = Some(global);
        }
        frame.global_setting_id = Some(frame_setting);
    }
    Ok(())
}

/// Per frame, in scan order: the global ID of each face and the frame label.
fn resolve_labels(
    scenes: &[Scene],
    components: &SettingComponents,
) -> Result<Vec<(Vec<GlobalSettingId>, FrameSetting)>, SettingMergeError> {
    let mut labels = Vec::new();
    for frame in scenes.iter().flat_map(|s| s.frames.iter()) {
        let mut face_globals = Vec::with_capacity(frame.faces.len());
        let mut frame_globals: Vec<GlobalSettingId> = Vec::new();
        for (face_index, face) in frame.faces.iter().enumerate() {
            let setting_id = face
                .setting_id
                .ok_or_else(|| SettingMergeError::MissingSettingId {
                    frame: frame.frame_path.clone(),
                    face_index,
                    person_id: face.person_id,
                })?;
            let global = components.get(&setting_id).ok_or_else(|| {
                SettingMergeError::UnknownSettingCluster {
                    frame: frame.frame_path.clone(),
                    setting_id,
                }
            })?;
            face_globals.push(global);
            if !frame_globals.contains(&global) {
                frame_globals.push(global);
            }
        }

        let frame_setting = match frame_globals.as_slice() {
            [] => FrameSetting::Unknown,
            [single] => FrameSetting::Global(*single),
            _ => {
                return Err(SettingMergeError::InconsistentSetting {
                    frame: frame.frame_path.clone(),
                    global_ids: frame_globals,
                })
            }
        };
        labels.push((face_globals, frame_setting));
    }
    Ok(labels)
}
