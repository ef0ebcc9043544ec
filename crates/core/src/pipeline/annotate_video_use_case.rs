use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::identity::domain::identity_repository::IdentityRepository;
use crate::pipeline::cluster_settings_use_case::ClusterSettingsUseCase;
use crate::pipeline::merge_settings_use_case::MergeSettingsUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::resolve_identities_use_case::ResolveIdentitiesUseCase;
use crate::shared::frame::Scene;
use crate::video::domain::manifest_reader::ManifestReader;
use crate::video::domain::manifest_writer::ManifestWriter;

/// What one annotation run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub frames: usize,
    pub faces: usize,
    pub skipped_frames: usize,
    pub persons: usize,
    pub new_persons: usize,
    pub person_clusters: BTreeMap<u32, usize>,
    pub global_settings: usize,
    pub unknown_frames: usize,
    pub oracle_calls: usize,
    pub oracle_failures: usize,
}

impl fmt::Display for AnnotationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} frames, {} faces ({} frames skipped)",
            self.frames, self.faces, self.skipped_frames
        )?;
        writeln!(
            f,
            "{} people ({} new), {} local settings",
            self.persons,
            self.new_persons,
            self.person_clusters.values().sum::<usize>()
        )?;
        write!(
            f,
            "{} global settings, {} frames without faces, {} oracle calls ({} failed)",
            self.global_settings, self.unknown_frames, self.oracle_calls, self.oracle_failures
        )
    }
}

/// End-to-end annotation: resolve identities, cluster settings per
/// person, merge them into global settings.
///
/// The identity store is loaded before any frame is touched, so a corrupt
/// store aborts the run up front. It is saved right after resolution;
/// later failures leave the newly registered people in place.
pub struct AnnotateVideoUseCase {
    repository: Box<dyn IdentityRepository>,
    resolver: ResolveIdentitiesUseCase,
    clusterer: ClusterSettingsUseCase,
    merger: MergeSettingsUseCase,
    logger: Box<dyn PipelineLogger>,
}

impl AnnotateVideoUseCase {
    pub fn new(
        repository: Box<dyn IdentityRepository>,
        resolver: ResolveIdentitiesUseCase,
        clusterer: ClusterSettingsUseCase,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            repository,
            resolver,
            clusterer,
            merger: MergeSettingsUseCase::new(),
            logger,
        }
    }

    /// Annotates `scenes` in place.
    pub fn annotate(
        &mut self,
        scenes: &mut [Scene],
    ) -> Result<AnnotationReport, Box<dyn std::error::Error>> {
        let mut store = self.repository.load()?;
        self.logger.info(&format!(
            "Loaded {} known identities (next id {})",
            store.len(),
            store.next_id()
        ));

        let resolution = self
            .resolver
            .execute(scenes, &mut store, self.logger.as_mut())?;
        self.repository.save(&store)?;

        let clustering = self.clusterer.execute(scenes, self.logger.as_mut())?;
        let merge = self.merger.execute(scenes, self.logger.as_mut())?;

        self.logger.summary();

        Ok(AnnotationReport {
            frames: resolution.frames,
            faces: resolution.faces,
            skipped_frames: resolution.skipped_frames,
            persons: clustering.persons,
            new_persons: resolution.new_persons,
            person_clusters: clustering.person_clusters,
            global_settings: merge.global_settings,
            unknown_frames: merge.unknown_frames,
            oracle_calls: clustering.oracle_calls,
            oracle_failures: clustering.oracle_failures,
        })
    }

    /// Reads a manifest, annotates it and writes the result to `output`.
    pub fn execute(
        &mut self,
        reader: &dyn ManifestReader,
        writer: &dyn ManifestWriter,
        manifest: &Path,
        output: &Path,
    ) -> Result<AnnotationReport, Box<dyn std::error::Error>> {
        let mut scenes = reader.read(manifest)?;
        let report = self.annotate(&mut scenes)?;
        writer.write(output, &scenes)?;
        Ok(report)
    }
}
