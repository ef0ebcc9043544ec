use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable image data in {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Encoded (not decoded) image bytes plus their MIME type.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Domain interface for fetching the pixel data behind a frame reference.
pub trait FrameLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<EncodedImage, FrameLoadError>;
}
