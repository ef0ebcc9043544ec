use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageError, ImageReader};

use crate::video::domain::frame_loader::{EncodedImage, FrameLoadError, FrameLoader};

/// Loads frame images from the filesystem.
///
/// The format is sniffed from the file contents, not the extension, and
/// the header is parsed to make sure the data is an image the `image`
/// crate can read. Pixels are not decoded.
pub struct ImageFileLoader;

impl ImageFileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, source: ImageError) -> FrameLoadError {
    FrameLoadError::Decode {
        path: path.to_path_buf(),
        source,
    }
}

impl FrameLoader for ImageFileLoader {
    fn load(&self, path: &Path) -> Result<EncodedImage, FrameLoadError> {
        let bytes = fs::read(path).map_err(|e| FrameLoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let format = image::guess_format(&bytes).map_err(|e| decode_error(path, e))?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| decode_error(path, e))?;
        log::trace!("{}: {format:?} {width}x{height}", path.display());

        Ok(EncodedImage {
            bytes,
            mime_type: format.to_mime_type(),
        })
    }
}
