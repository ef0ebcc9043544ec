use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use locus_core::identity::domain::identity_repository::IdentityRepository;
use locus_core::identity::infrastructure::json_identity_repository::JsonIdentityRepository;
use locus_core::pipeline::annotate_video_use_case::AnnotateVideoUseCase;
use locus_core::pipeline::cluster_executor::{ClusterExecutor, SequentialClusterExecutor};
use locus_core::pipeline::cluster_settings_use_case::ClusterSettingsUseCase;
use locus_core::pipeline::infrastructure::threaded_cluster_executor::ThreadedClusterExecutor;
use locus_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use locus_core::pipeline::resolve_identities_use_case::ResolveIdentitiesUseCase;
use locus_core::setting::domain::setting_clusterer::SettingClusterer;
use locus_core::setting::domain::setting_oracle::SettingOracle;
use locus_core::setting::infrastructure::cached_setting_oracle::CachedSettingOracle;
use locus_core::setting::infrastructure::fixed_setting_oracle::FixedSettingOracle;
use locus_core::setting::infrastructure::openai_setting_oracle::{
    OpenAiOracleConfig, OpenAiSettingOracle,
};
use locus_core::shared::constants::{
    DEFAULT_MATCH_THRESHOLD, DEFAULT_ORACLE_BASE_URL, DEFAULT_ORACLE_MODEL,
    DEFAULT_ORACLE_TIMEOUT_SECS,
};
use locus_core::video::infrastructure::image_file_loader::ImageFileLoader;
use locus_core::video::infrastructure::json_manifest_reader::JsonManifestReader;
use locus_core::video::infrastructure::json_manifest_writer::JsonManifestWriter;

/// Person identity and setting annotation for sampled video frames.
#[derive(Parser)]
#[command(name = "locus", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assign person, setting and global setting IDs to a frame manifest.
    Annotate(AnnotateArgs),
    /// Show what the identity store currently holds.
    Identities {
        /// Identity store file (defaults to the platform data directory).
        #[arg(long)]
        identity_db: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OracleKind {
    /// OpenAI-compatible multimodal chat completions.
    Openai,
    /// Every comparison answers "same setting" (offline dry run).
    AlwaysSame,
    /// Every comparison answers "different setting" (offline dry run).
    NeverSame,
}

#[derive(Args)]
struct AnnotateArgs {
    /// Input manifest (JSON with scenes, frames and face embeddings).
    manifest: PathBuf,

    /// Output path for the annotated manifest.
    output: PathBuf,

    /// Identity store file (defaults to the platform data directory).
    #[arg(long)]
    identity_db: Option<PathBuf>,

    /// Minimum cosine similarity for two faces to be the same person (-1.0 to 1.0).
    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    threshold: f32,

    /// Worker threads for per-person setting clustering.
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Same-setting oracle backend.
    #[arg(long, value_enum, default_value = "openai")]
    oracle: OracleKind,

    /// Model name sent to the oracle endpoint.
    #[arg(long, default_value = DEFAULT_ORACLE_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, default_value = DEFAULT_ORACLE_BASE_URL)]
    base_url: String,

    /// Timeout for a single oracle call, in seconds.
    #[arg(long, default_value_t = DEFAULT_ORACLE_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Stop scanning a person's history after this many comparisons per frame.
    #[arg(long)]
    max_comparisons: Option<usize>,

    /// Log progress every N frames.
    #[arg(long, default_value = "25")]
    progress_every: usize,

    /// API key for the oracle endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Annotate(args) => {
            validate(&args)?;
            run_annotate(args)
        }
        Command::Identities { identity_db } => run_identities(identity_db),
    }
}

fn run_annotate(args: AnnotateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store_path = resolve_store_path(args.identity_db.clone())?;
    log::info!("Identity store: {}", store_path.display());

    let oracle = build_oracle(&args)?;
    let shared: Arc<dyn SettingOracle> = oracle.clone();
    let clusterer = SettingClusterer::new(shared, args.max_comparisons);
    let executor: Box<dyn ClusterExecutor> = if args.workers > 1 {
        Box::new(ThreadedClusterExecutor::new(args.workers))
    } else {
        Box::new(SequentialClusterExecutor)
    };

    let mut use_case = AnnotateVideoUseCase::new(
        Box::new(JsonIdentityRepository::new(store_path)),
        ResolveIdentitiesUseCase::new(Box::new(ImageFileLoader::new()), args.threshold),
        ClusterSettingsUseCase::new(clusterer, executor),
        Box::new(StdoutPipelineLogger::new(args.progress_every)),
    );
    let report = use_case.execute(
        &JsonManifestReader::new(),
        &JsonManifestWriter::new(),
        &args.manifest,
        &args.output,
    )?;

    log::info!("{report}");
    if oracle.hits() > 0 {
        log::info!("Oracle cache answered {} repeated comparisons", oracle.hits());
    }
    log::info!("Output written to {}", args.output.display());
    Ok(())
}

fn run_identities(identity_db: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let repository = JsonIdentityRepository::new(resolve_store_path(identity_db)?);
    let store = repository.load()?;

    println!("Identity store: {}", repository.path().display());
    println!("Known people:   {}", store.len());
    println!("Next id:        {}", store.next_id());
    match store.dim() {
        Some(dim) => println!("Embedding dim:  {dim}"),
        None => println!("Embedding dim:  -"),
    }
    Ok(())
}

fn build_oracle(args: &AnnotateArgs) -> Result<Arc<CachedSettingOracle>, Box<dyn std::error::Error>> {
    let inner: Box<dyn SettingOracle> = match args.oracle {
        OracleKind::Openai => {
            let config = OpenAiOracleConfig {
                api_key: args.api_key.clone().unwrap_or_default(),
                base_url: args.base_url.clone(),
                model: args.model.clone(),
                timeout: Duration::from_secs(args.timeout_secs),
            };
            log::info!("Setting oracle: {} at {}", config.model, config.base_url);
            Box::new(OpenAiSettingOracle::new(config, Box::new(ImageFileLoader::new()))?)
        }
        OracleKind::AlwaysSame => Box::new(FixedSettingOracle::new(true)),
        OracleKind::NeverSame => Box::new(FixedSettingOracle::new(false)),
    };
    Ok(Arc::new(CachedSettingOracle::new(inner)))
}

fn resolve_store_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path),
        None => JsonIdentityRepository::default_path()
            .ok_or_else(|| "Could not determine a data directory; pass --identity-db".into()),
    }
}

fn validate(args: &AnnotateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.manifest.exists() {
        return Err(format!("Manifest not found: {}", args.manifest.display()).into());
    }
    if !(-1.0..=1.0).contains(&args.threshold) {
        return Err(format!(
            "Threshold must be between -1.0 and 1.0, got {}",
            args.threshold
        )
        .into());
    }
    if args.workers == 0 {
        return Err("Workers must be at least 1".into());
    }
    if args.timeout_secs == 0 {
        return Err("Timeout must be greater than 0 seconds".into());
    }
    if args.max_comparisons == Some(0) {
        return Err("Max comparisons must be at least 1 when set".into());
    }
    if same_path(&args.manifest, &args.output) {
        return Err("Output must not overwrite the input manifest".into());
    }
    if args.oracle == OracleKind::Openai
        && args.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
    {
        return Err(
            "An API key is required for --oracle openai (set OPENAI_API_KEY or pass --api-key)"
                .into(),
        );
    }
    Ok(())
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> String {
        concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml").to_string()
    }

    fn annotate_args(extra: &[&str]) -> AnnotateArgs {
        let manifest = manifest();
        let mut argv = vec!["locus", "annotate", manifest.as_str(), "/tmp/locus-out.json"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Annotate(args) => args,
            Command::Identities { .. } => panic!("expected annotate"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = annotate_args(&["--oracle", "always-same"]);
        assert_eq!(args.threshold, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(args.workers, 4);
        assert_eq!(args.timeout_secs, DEFAULT_ORACLE_TIMEOUT_SECS);
        assert_eq!(args.max_comparisons, None);
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let args = annotate_args(&["--oracle", "never-same", "--threshold", "1.5"]);
        assert!(validate(&args).is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let args = annotate_args(&["--oracle", "never-same", "--workers", "0"]);
        assert!(validate(&args).is_err());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let mut args = annotate_args(&["--oracle", "openai"]);
        args.api_key = None;
        assert!(validate(&args).is_err());
        args.api_key = Some("sk-test".into());
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn test_rejects_missing_manifest() {
        let mut args = annotate_args(&["--oracle", "always-same"]);
        args.manifest = PathBuf::from("/definitely/not/here.json");
        assert!(validate(&args).is_err());
    }

    #[test]
    fn test_rejects_output_over_input() {
        let mut args = annotate_args(&["--oracle", "always-same"]);
        args.output = args.manifest.clone();
        assert!(validate(&args).is_err());
    }
}
