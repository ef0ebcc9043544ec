use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use locus_core::identity::domain::identity_repository::IdentityRepository;
use locus_core::identity::infrastructure::json_identity_repository::JsonIdentityRepository;
use locus_core::pipeline::annotate_video_use_case::{AnnotateVideoUseCase, AnnotationReport};
use locus_core::pipeline::cluster_settings_use_case::ClusterSettingsUseCase;
use locus_core::pipeline::infrastructure::threaded_cluster_executor::ThreadedClusterExecutor;
use locus_core::pipeline::pipeline_logger::NullPipelineLogger;
use locus_core::pipeline::resolve_identities_use_case::ResolveIdentitiesUseCase;
use locus_core::setting::domain::setting_clusterer::SettingClusterer;
use locus_core::setting::domain::setting_oracle::{OracleError, SettingOracle};
use locus_core::video::infrastructure::image_file_loader::ImageFileLoader;
use locus_core::video::infrastructure::json_manifest_reader::JsonManifestReader;
use locus_core::video::infrastructure::json_manifest_writer::JsonManifestWriter;

/// Frames named `<place>_<n>.png` are in the same setting when `<place>`
/// matches.
struct PlaceOracle {
    calls: AtomicUsize,
}

fn place(path: &Path) -> String {
    let stem = path.file_stem().unwrap().to_string_lossy();
    stem.split('_').next().unwrap().to_string()
}

impl SettingOracle for PlaceOracle {
    fn same_setting(&self, frame: &Path, other: &Path) -> Result<bool, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(place(frame) == place(other))
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for name in ["kitchen_1.png", "kitchen_2.png", "empty_3.png", "beach_4.png"] {
            image::RgbImage::new(4, 4)
                .save_with_format(dir.path().join(name), image::ImageFormat::Png)
                .unwrap();
        }
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn frame(&self, name: &str, embeddings: &[[f32; 3]]) -> Value {
        let faces: Vec<Value> = embeddings
            .iter()
            .map(|e| {
                json!({
                    "embedding": e,
                    "bounding_box": { "top": 10, "right": 50, "bottom": 60, "left": 5 },
                })
            })
            .collect();
        json!({ "frame_path": self.path(name), "faces": faces })
    }

    /// A, B and C never share a frame all together, but A-B and B-C do.
    fn write_manifest(&self) -> PathBuf {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        let c = [0.0, 0.02, 0.9];
        let manifest = json!({
            "scenes": [
                {
                    "scene_number": 1,
                    "frames": [
                        self.frame("kitchen_1.png", &[a, b]),
                        self.frame("kitchen_2.png", &[b, c]),
                        self.frame("empty_3.png", &[]),
                    ],
                },
                {
                    "scene_number": 2,
                    "frames": [
                        self.frame("beach_4.png", &[[0.98, 0.05, 0.0]]),
                        self.frame("missing_5.png", &[a]),
                    ],
                },
            ],
        });
        let path = self.path("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
        path
    }

    fn store_path(&self) -> PathBuf {
        self.path("store").join("known_faces.json")
    }

    fn run(&self, oracle: Arc<PlaceOracle>) -> (AnnotationReport, Value) {
        let manifest = self.write_manifest();
        let output = self.path("annotated.json");

        let mut use_case = AnnotateVideoUseCase::new(
            Box::new(JsonIdentityRepository::new(self.store_path())),
            ResolveIdentitiesUseCase::new(Box::new(ImageFileLoader::new()), 0.5),
            ClusterSettingsUseCase::new(
                SettingClusterer::new(oracle, None),
                Box::new(ThreadedClusterExecutor::new(3)),
            ),
            Box::new(NullPipelineLogger),
        );
        let report = use_case
            .execute(
                &JsonManifestReader::new(),
                &JsonManifestWriter::new(),
                &manifest,
                &output,
            )
            .unwrap();

        let annotated = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        (report, annotated)
    }
}

fn frames(annotated: &Value) -> Vec<&Value> {
    annotated["scenes"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["frames"].as_array().unwrap())
        .collect()
}

fn oracle() -> Arc<PlaceOracle> {
    Arc::new(PlaceOracle {
        calls: AtomicUsize::new(0),
    })
}

#[test]
fn test_co_occurrence_links_settings_transitively() {
    let fixture = Fixture::new();
    let (report, annotated) = fixture.run(oracle());
    let frames = frames(&annotated);

    assert_eq!(frames[0]["global_setting_id"], "global_setting_0");
    assert_eq!(frames[1]["global_setting_id"], "global_setting_0");
    assert_eq!(frames[3]["global_setting_id"], "global_setting_1");

    assert_eq!(frames[0]["faces"][0]["person_id"], 0);
    assert_eq!(frames[0]["faces"][0]["setting_id"], "person_0_setting_0");
    assert_eq!(frames[0]["faces"][1]["setting_id"], "person_1_setting_0");
    assert_eq!(frames[1]["faces"][0]["setting_id"], "person_1_setting_0");
    assert_eq!(frames[1]["faces"][1]["setting_id"], "person_2_setting_0");
    assert_eq!(frames[1]["faces"][1]["global_setting_id"], "global_setting_0");
    assert_eq!(frames[3]["faces"][0]["setting_id"], "person_0_setting_1");

    assert_eq!(report.global_settings, 2);
    assert_eq!(report.persons, 3);
}

#[test]
fn test_frames_without_faces_are_unknown() {
    let fixture = Fixture::new();
    let (report, annotated) = fixture.run(oracle());
    let frames = frames(&annotated);

    assert_eq!(frames[2]["global_setting_id"], "Unknown");
    assert_eq!(frames[4]["global_setting_id"], "Unknown");
    assert_eq!(frames[4]["faces"].as_array().unwrap().len(), 0);
    assert_eq!(frames[4]["scene_number"], 2);

    assert_eq!(report.frames, 5);
    assert_eq!(report.skipped_frames, 1);
    assert_eq!(report.unknown_frames, 2);
}

#[test]
fn test_identity_store_is_persisted() {
    let fixture = Fixture::new();
    let (report, _) = fixture.run(oracle());

    let store = JsonIdentityRepository::new(fixture.store_path())
        .load()
        .unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(store.next_id(), 3);
    assert_eq!(store.dim(), Some(3));
    assert_eq!(report.new_persons, 3);
}

#[test]
fn test_second_run_reuses_identities() {
    let fixture = Fixture::new();
    let (_, first) = fixture.run(oracle());
    let (report, second) = fixture.run(oracle());

    assert_eq!(report.new_persons, 0);
    assert_eq!(first, second);

    let store = JsonIdentityRepository::new(fixture.store_path())
        .load()
        .unwrap();
    assert_eq!(store.next_id(), 3);
}

#[test]
fn test_oracle_calls_are_counted() {
    let fixture = Fixture::new();
    let oracle = oracle();
    let (report, _) = fixture.run(oracle.clone());

    // person 0: kitchen_1 vs beach_4; person 1: kitchen_2 vs kitchen_1
    assert_eq!(report.oracle_calls, 2);
    assert_eq!(oracle.calls.load(Ordering::Relaxed), 2);
}

#[test]
fn test_corrupt_store_aborts_run() {
    let fixture = Fixture::new();
    let manifest = fixture.write_manifest();
    let output = fixture.path("annotated.json");
    fs::create_dir_all(fixture.store_path().parent().unwrap()).unwrap();
    fs::write(fixture.store_path(), "{ not json").unwrap();

    let mut use_case = AnnotateVideoUseCase::new(
        Box::new(JsonIdentityRepository::new(fixture.store_path())),
        ResolveIdentitiesUseCase::new(Box::new(ImageFileLoader::new()), 0.5),
        ClusterSettingsUseCase::new(
            SettingClusterer::new(oracle(), None),
            Box::new(ThreadedClusterExecutor::new(2)),
        ),
        Box::new(NullPipelineLogger),
    );
    let result = use_case.execute(
        &JsonManifestReader::new(),
        &JsonManifestWriter::new(),
        &manifest,
        &output,
    );

    assert!(result.is_err());
    assert!(!output.exists());
    assert_eq!(fs::read_to_string(fixture.store_path()).unwrap(), "{ not json");
}
