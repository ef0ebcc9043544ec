use std::time::Instant;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::setting::domain::global_setting_merger::{build_graph, propagate, SettingMergeError};
use crate::shared::frame::Scene;
use crate::shared::setting_id::FrameSetting;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub local_settings: usize,
    pub co_occurrences: usize,
    pub global_settings: usize,
    pub unknown_frames: usize,
}

/// Joins per-person clusters that share a frame into global settings and
/// labels every face and frame with the result.
pub struct MergeSettingsUseCase;

impl MergeSettingsUseCase {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(
        &self,
        scenes: &mut [Scene],
        logger: &mut dyn PipelineLogger,
    ) -> Result<MergeReport, SettingMergeError> {
        let start = Instant::now();
        let mut graph = build_graph(scenes)?;
        let local_settings = graph.node_count();
        let co_occurrences = graph.edge_count();
        let components = graph.components();
        propagate(scenes, &components)?;
        logger.timing("merge", start.elapsed().as_secs_f64() * 1000.0);

        let unknown_frames = scenes
            .iter()
            .flat_map(|s| s.frames.iter())
            .filter(|f| f.global_setting_id == Some(FrameSetting::Unknown))
            .count();

        let report = MergeReport {
            local_settings,
            co_occurrences,
            global_settings: components.len(),
            unknown_frames,
        };
        logger.metric("global_settings", report.global_settings as f64);
        logger.info(&format!(
            "Merged {} local settings ({} co-occurrences) into {} global settings",
            report.local_settings, report.co_occurrences, report.global_settings
        ));
        Ok(report)
    }
}

impl Default for MergeSettingsUseCase {
    fn default() -> Self {
        Self::new()
    }
}
