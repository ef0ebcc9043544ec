use std::time::Instant;

use crate::identity::domain::identity_store::{IdentityStore, IdentityStoreError};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::{count_frames, Scene};
use crate::video::domain::frame_loader::FrameLoader;

/// Counters from one identity resolution pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub frames: usize,
    pub faces: usize,
    pub skipped_frames: usize,
    pub new_persons: usize,
}

/// Assigns a person ID to every face, in scan order.
///
/// The store is the single writer's state for the whole pass: resolution
/// never runs concurrently, so an identity registered by an earlier face
/// is visible to every later one.
pub struct ResolveIdentitiesUseCase {
    loader: Box<dyn FrameLoader>,
    threshold: f32,
}

impl ResolveIdentitiesUseCase {
    pub fn new(loader: Box<dyn FrameLoader>, threshold: f32) -> Self {
        Self { loader, threshold }
    }

    /// Resolves every face against `store`, registering newcomers.
    ///
    /// A frame whose image cannot be read is logged and stripped of its
    /// faces, so it later resolves to the unknown setting.
    pub fn execute(
        &self,
        scenes: &mut [Scene],
        store: &mut IdentityStore,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ResolutionReport, IdentityStoreError> {
        let total = count_frames(scenes);
        let persons_before = store.next_id();
        let mut report = ResolutionReport {
            frames: total,
            ..Default::default()
        };
        let mut current = 0;

        for scene in scenes.iter_mut() {
            for frame in scene.frames.iter_mut() {
                current += 1;
                let start = Instant::now();

                if let Err(e) = self.loader.load(&frame.frame_path) {
                    log::warn!(
                        "Skipping unreadable frame {} in scene {}: {e}",
                        frame.frame_path.display(),
                        scene.scene_number
                    );
                    frame.faces.clear();
                    report.skipped_frames += 1;
                    logger.progress(current, total);
                    continue;
                }

                for face in frame.faces.iter_mut() {
                    let person_id = store.match_or_register(&face.embedding, self.threshold)?;
                    face.person_id = Some(person_id);
                    report.faces += 1;
                }

                logger.timing("resolve", start.elapsed().as_secs_f64() * 1000.0);
                logger.progress(current, total);
            }
        }

        report.new_persons = (store.next_id() - persons_before) as usize;
        logger.metric("faces", report.faces as f64);
        logger.metric("new_persons", report.new_persons as f64);
        logger.info(&format!(
            "Resolved {} faces in {} frames ({} new people, {} frames skipped)",
            report.faces, report.frames, report.new_persons, report.skipped_frames
        ));
        Ok(report)
    }
}
