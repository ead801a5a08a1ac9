//! Still image capture and Display Surface rendering.

use image::imageops::FilterType;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::selection::SurfaceSize;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("image not found: {0}. Check the path or take a new photo")]
    NotFound(PathBuf),

    #[error("could not read image {path}: {reason}. Use a PNG or JPEG photo instead")]
    Unreadable { path: PathBuf, reason: String },

    #[error("image {0} has no pixels. Retake the photo")]
    Empty(PathBuf),
}

/// The photograph being annotated. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Where the image came from (file path or label)
    pub origin: String,
    pub bitmap: RgbaImage,
}

impl SourceImage {
    pub fn new(origin: impl Into<String>, bitmap: RgbaImage) -> Self {
        Self {
            origin: origin.into(),
            bitmap,
        }
    }

    /// Intrinsic pixel dimensions `(W, H)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }
}

/// Loads a still photo from disk as the Source Bitmap.
pub fn load_still(path: &Path) -> Result<SourceImage, CaptureError> {
    if !path.exists() {
        return Err(CaptureError::NotFound(path.to_path_buf()));
    }

    let img = image::open(path).map_err(|e| CaptureError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let bitmap = img.to_rgba8();
    let (w, h) = bitmap.dimensions();
    if w == 0 || h == 0 {
        return Err(CaptureError::Empty(path.to_path_buf()));
    }

    crate::log(&format!("Loaded image {} ({}x{})", path.display(), w, h));
    Ok(SourceImage::new(path.display().to_string(), bitmap))
}

/// Draws the source into a Display Surface buffer of the given size.
pub fn render_surface(source: &SourceImage, surface: SurfaceSize) -> RgbaImage {
    let (sw, sh) = surface.pixels();
    if source.dimensions() == (sw, sh) {
        return source.bitmap.clone();
    }
    image::imageops::resize(&source.bitmap, sw, sh, FilterType::Triangle)
}
