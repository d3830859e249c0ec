//! High-level image operations.
//!
//! These functions combine calculations with backend execution. The public
//! entry points never fail: a decode error is logged and the caller gets
//! `None`. The `try_*` variants keep the error for callers (and tests) that
//! want it.

use super::backend::{DecodeBackend, DecodeError, Demosaic};
use super::calculations::{fit_within, is_undersized};
use super::resize::resize_area;
use crate::formats::FileKind;
use image::RgbImage;
use std::path::Path;
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Configuration for preview generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Bounding box `(width, height)` the preview must fit inside.
    pub max_size: (u32, u32),
    /// Embedded RAW previews with either edge below this are discarded in
    /// favour of a full develop.
    pub min_preview_edge: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_size: (1600, 1200),
            min_preview_edge: 1000,
        }
    }
}

/// Full-resolution RGB for `path`, or `None` if it cannot be decoded.
pub fn load_image(backend: &impl DecodeBackend, path: &Path) -> Option<RgbImage> {
    match try_load_image(backend, path) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load image");
            None
        }
    }
}

pub fn try_load_image(backend: &impl DecodeBackend, path: &Path) -> Result<RgbImage> {
    match FileKind::of(path) {
        Some(FileKind::Raw) => backend.decode_raw(path, Demosaic::Bilinear),
        _ => backend.decode(path),
    }
}

/// Bounded-size RGB preview for `path`, or `None` if it cannot be decoded.
pub fn load_thumbnail(
    backend: &impl DecodeBackend,
    path: &Path,
    config: &ThumbnailConfig,
) -> Option<RgbImage> {
    match try_load_thumbnail(backend, path, config) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load thumbnail");
            None
        }
    }
}

pub fn try_load_thumbnail(
    backend: &impl DecodeBackend,
    path: &Path,
    config: &ThumbnailConfig,
) -> Result<RgbImage> {
    let img = match FileKind::of(path) {
        Some(FileKind::Raw) => raw_preview(backend, path, config)?,
        _ => backend.decode(path)?,
    };
    Ok(shrink_to_fit(&img, config.max_size))
}

/// Embedded preview when it is big enough, otherwise a high-quality develop.
fn raw_preview(
    backend: &impl DecodeBackend,
    path: &Path,
    config: &ThumbnailConfig,
) -> Result<RgbImage> {
    match embedded_preview(backend, path) {
        Ok(img) if !is_undersized(img.dimensions(), config.min_preview_edge) => {
            return Ok(img);
        }
        Ok(img) => {
            let (w, h) = img.dimensions();
            debug!(
                path = %path.display(),
                width = w,
                height = h,
                "embedded preview too small, developing RAW"
            );
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no usable embedded preview, developing RAW");
        }
    }
    backend.decode_raw(path, Demosaic::HighQuality)
}

fn embedded_preview(backend: &impl DecodeBackend, path: &Path) -> Result<RgbImage> {
    let preview = backend.extract_preview(path)?;
    let img = image::load_from_memory_with_format(&preview.data, preview.format)?;
    Ok(img.to_rgb8())
}

/// Downscale into `bounds` keeping aspect ratio. Smaller images pass through.
pub fn shrink_to_fit(img: &RgbImage, bounds: (u32, u32)) -> RgbImage {
    let (w, h) = img.dimensions();
    let (new_w, new_h) = fit_within((w, h), bounds);
    if (new_w, new_h) == (w, h) {
        return img.clone();
    }
    resize_area(img, new_w, new_h)
}
