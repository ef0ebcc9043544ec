use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::video::domain::frame_loader::FrameLoadError;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("failed to load frame {path}: {source}")]
    FrameLoad {
        path: PathBuf,
        #[source]
        source: FrameLoadError,
    },
    #[error("oracle call timed out")]
    Timeout,
    #[error("oracle request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),
}

/// Domain interface for the external same-setting judgement.
///
/// Answers whether two frames depict the same real-world place. Callers
/// treat any error as "not the same setting".
pub trait SettingOracle: Send + Sync {
    fn same_setting(&self, frame: &Path, other: &Path) -> Result<bool, OracleError>;
}
