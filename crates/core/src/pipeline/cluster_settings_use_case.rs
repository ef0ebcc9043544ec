use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;

use crate::pipeline::cluster_executor::ClusterExecutor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::setting::domain::setting_clusterer::{
    PersonClusters, PersonTimeline, SettingClusterer, TimelineEntry,
};
use crate::shared::frame::Scene;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("face {face_index} in frame {frame} reached clustering without a person id")]
    UnresolvedIdentity { frame: PathBuf, face_index: usize },
}

/// Counters from one clustering pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusteringReport {
    pub persons: usize,
    /// Number of local setting clusters per person.
    pub person_clusters: BTreeMap<u32, usize>,
    pub oracle_calls: usize,
    pub oracle_failures: usize,
}

impl ClusteringReport {
    pub fn total_clusters(&self) -> usize {
        self.person_clusters.values().sum()
    }
}

/// Groups each person's frames into local setting clusters and writes
/// the resulting setting IDs back onto the faces.
pub struct ClusterSettingsUseCase {
    clusterer: SettingClusterer,
    executor: Box<dyn ClusterExecutor>,
}

impl ClusterSettingsUseCase {
    pub fn new(clusterer: SettingClusterer, executor: Box<dyn ClusterExecutor>) -> Self {
        Self {
            clusterer,
            executor,
        }
    }

    pub fn execute(
        &self,
        scenes: &mut [Scene],
        logger: &mut dyn PipelineLogger,
    ) -> Result<ClusteringReport, Box<dyn std::error::Error>> {
        let timelines = build_timelines(scenes)?;
        logger.info(&format!("Clustering settings for {} people", timelines.len()));

        let start = Instant::now();
        let results = self.executor.execute(&self.clusterer, timelines.clone())?;
        logger.timing("cluster", start.elapsed().as_secs_f64() * 1000.0);

        if results.len() != timelines.len() {
            return Err(format!(
                "clustered {} of {} people",
                results.len(),
                timelines.len()
            )
            .into());
        }

        let mut report = ClusteringReport {
            persons: results.len(),
            ..Default::default()
        };
        for (timeline, clusters) in timelines.iter().zip(&results) {
            if timeline.person_id != clusters.person_id
                || timeline.entries.len() != clusters.setting_ids.len()
            {
                return Err(format!(
                    "cluster result for person {} does not match its timeline",
                    clusters.person_id
                )
                .into());
            }
            apply(scenes, timeline, clusters);

            report
                .person_clusters
                .insert(clusters.person_id, clusters.cluster_count());
            report.oracle_calls += clusters.oracle_calls;
            report.oracle_failures += clusters.oracle_failures;
            logger.metric("clusters_per_person", clusters.cluster_count() as f64);
            log::info!(
                "Person {}: {} frames in {} settings ({} oracle calls)",
                clusters.person_id,
                timeline.entries.len(),
                clusters.cluster_count(),
                clusters.oracle_calls
            );
        }

        logger.metric("oracle_calls", report.oracle_calls as f64);
        if report.oracle_failures > 0 {
            log::warn!(
                "{} of {} oracle calls failed and were treated as different settings",
                report.oracle_failures,
                report.oracle_calls
            );
        }
        Ok(report)
    }
}

/// One timeline per person, sorted by person ID, with entries in scan
/// order. A person seen twice in one frame gets a single entry for it.
pub fn build_timelines(scenes: &[Scene]) -> Result<Vec<PersonTimeline>, ClusterError> {
    let mut by_person: BTreeMap<u32, Vec<TimelineEntry>> = BTreeMap::new();

    for (scene_index, scene) in scenes.iter().enumerate() {
        for (frame_index, frame) in scene.frames.iter().enumerate() {
            let mut seen: Vec<u32> = Vec::with_capacity(frame.faces.len());
            for (face_index, face) in frame.faces.iter().enumerate() {
                let person_id = face.person_id.ok_or_else(|| ClusterError::UnresolvedIdentity {
                    frame: frame.frame_path.clone(),
                    face_index,
                })?;
                if seen.contains(&person_id) {
                    continue;
                }
                seen.push(person_id);
                by_person.entry(person_id).or_default().push(TimelineEntry {
                    scene_index,
                    frame_index,
                    frame_path: frame.frame_path.clone(),
                });
            }
        }
    }

    Ok(by_person
        .into_iter()
        .map(|(person_id, entries)| PersonTimeline { person_id, entries })
        .collect())
}

fn apply(scenes: &mut [Scene], timeline: &PersonTimeline, clusters: &PersonClusters) {
    for (entry, setting_id) in timeline.entries.iter().zip(&clusters.setting_ids) {
        let frame = &mut scenes[entry.scene_index].frames[entry.frame_index];
        for face in frame
            .faces
            .iter_mut()
            .filter(|f| f.person_id == Some(timeline.person_id))
        {
            face.setting_id = Some(*setting_id);
        }
    }
}
