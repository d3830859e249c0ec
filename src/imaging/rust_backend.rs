//! Pure Rust decode backend: no system libraries.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG family) | `image::ImageReader` with content sniffing |
//! | Dimensions | `ImageReader::into_dimensions` (header only) |
//! | RAW sensor data | `rawloader::decode_file` |
//! | Demosaic + sRGB | [`demosaic`](super::demosaic) |
//! | Embedded preview | [`preview::largest_jpeg`](super::preview::largest_jpeg) |
//!
//! The RAW path develops with the camera's as-shot white balance, no
//! exposure compensation and no auto-brightening. There is no camera colour
//! matrix: output is white-balanced camera RGB with the sRGB tone curve,
//! which is enough for display and focus scoring but not a faithful render.

use super::backend::{
    DecodeBackend, DecodeError, Demosaic, Dimensions, EmbeddedPreview, RawInfo, RawType,
};
use super::demosaic::{self, CfaPattern, Crop, GREEN, Mosaic};
use super::preview::largest_jpeg;
use image::{ImageFormat, ImageReader, RgbImage};
use rawloader::{RawImage, RawImageData};
use std::path::Path;
use tracing::warn;

/// Production backend.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn read_raw(path: &Path) -> Result<RawImage, DecodeError> {
    guarded(path, || rawloader::decode_file(path))
}

/// Run a RAW decoder call, turning both its error and a panic inside it into
/// [`DecodeError::Raw`]. rawloader indexes straight into the file buffer and
/// panics on truncated or malformed input.
fn guarded<T, E: std::fmt::Display>(
    path: &Path,
    decode: impl FnOnce() -> Result<T, E>,
) -> Result<T, DecodeError> {
    let raw_error = |reason: String| DecodeError::Raw {
        path: path.to_path_buf(),
        reason,
    };
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(decode)) {
        Ok(result) => result.map_err(|e| raw_error(e.to_string())),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown cause".to_string());
            warn!(path = %path.display(), %message, "RAW decoder panicked");
            Err(raw_error(format!("decoder panicked: {message}")))
        }
    }
}

/// White balance multipliers normalized to green = 1. Missing or invalid
/// coefficients are neutral; the second green falls back to the first.
fn white_balance(coeffs: [f32; 4]) -> [f32; 4] {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    let green = if valid(coeffs[1]) { coeffs[1] } else { 1.0 };
    let norm = |v: f32| if valid(v) { v / green } else { 1.0 };
    [
        norm(coeffs[0]),
        1.0,
        norm(coeffs[2]),
        if valid(coeffs[3]) { coeffs[3] / green } else { 1.0 },
    ]
}

fn samples(raw: &RawImage) -> Vec<f32> {
    match &raw.data {
        RawImageData::Integer(values) => values.iter().map(|&v| v as f32).collect(),
        RawImageData::Float(values) => values.clone(),
    }
}

fn level_scale(raw: &RawImage, channel: usize) -> (f32, f32) {
    let black = raw.blacklevels[channel] as f32;
    let white = raw.whitelevels[channel] as f32;
    let range = (white - black).max(1.0);
    (black, range)
}

/// Sensor pattern as our own type; the fourth CFA colour (second green on
/// some sensors) folds into green.
fn cfa_pattern(raw: &RawImage) -> Result<CfaPattern, DecodeError> {
    let (w, h) = (raw.cfa.width, raw.cfa.height);
    let mut colors = Vec::with_capacity(w * h);
    for row in 0..h {
        for col in 0..w {
            colors.push(match raw.cfa.color_at(row, col) {
                c @ 0..=2 => c as u8,
                _ => GREEN,
            });
        }
    }
    CfaPattern::new(w, h, colors)
        .ok_or_else(|| DecodeError::UnsupportedLayout(format!("CFA '{}'", raw.cfa.name)))
}

/// Crop rectangle from rawloader's `[top, right, bottom, left]` margins.
/// Nonsensical margins mean the full frame.
fn crop_rect(raw: &RawImage) -> Crop {
    let [top, right, bottom, left] = raw.crops;
    match (
        raw.width.checked_sub(left + right),
        raw.height.checked_sub(top + bottom),
    ) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (left, top, w, h),
        _ => (0, 0, raw.width, raw.height),
    }
}

fn develop(raw: &RawImage, quality: Demosaic) -> Result<RgbImage, DecodeError> {
    let (width, height) = (raw.width, raw.height);
    let wb = white_balance(raw.wb_coeffs);
    let data = samples(raw);

    let rgb = match raw.cpp {
        1 => {
            let cfa = cfa_pattern(raw)?;
            if data.len() < width * height {
                return Err(DecodeError::ProcessingFailed(format!(
                    "sensor data has {} samples, expected {}",
                    data.len(),
                    width * height
                )));
            }
            let mut values = Vec::with_capacity(width * height);
            for row in 0..height {
                for col in 0..width {
                    let c = raw.cfa.color_at(row, col).min(3);
                    let (black, range) = level_scale(raw, c);
                    let v = (data[row * width + col] - black) / range;
                    values.push(v.max(0.0) * wb[c]);
                }
            }
            demosaic::demosaic(
                &Mosaic {
                    width,
                    height,
                    values,
                    cfa,
                },
                quality,
            )
        }
        3 => {
            if data.len() < width * height * 3 {
                return Err(DecodeError::ProcessingFailed(
                    "short RGB sensor data".to_string(),
                ));
            }
            data.iter()
                .take(width * height * 3)
                .enumerate()
                .map(|(i, &v)| {
                    let c = i % 3;
                    let (black, range) = level_scale(raw, c);
                    ((v - black) / range).max(0.0) * wb[c]
                })
                .collect()
        }
        cpp => {
            return Err(DecodeError::UnsupportedLayout(format!(
                "{cpp} components per pixel"
            )));
        }
    };

    Ok(demosaic::render_srgb(&rgb, width, crop_rect(raw)))
}

impl DecodeBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<RgbImage, DecodeError> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(img.to_rgb8())
    }

    fn dimensions(&self, path: &Path) -> Result<Dimensions, DecodeError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Dimensions { width, height })
    }

    fn decode_raw(&self, path: &Path, demosaic: Demosaic) -> Result<RgbImage, DecodeError> {
        let raw = read_raw(path)?;
        develop(&raw, demosaic)
    }

    fn extract_preview(&self, path: &Path) -> Result<EmbeddedPreview, DecodeError> {
        let bytes = std::fs::read(path)?;
        let span = largest_jpeg(&bytes).ok_or_else(|| DecodeError::NoPreview(path.to_path_buf()))?;
        Ok(EmbeddedPreview {
            format: ImageFormat::Jpeg,
            data: bytes[span.start..span.end].to_vec(),
        })
    }

    fn raw_info(&self, path: &Path) -> Result<RawInfo, DecodeError> {
        let raw = read_raw(path)?;
        let (_, _, width, height) = crop_rect(&raw);
        let (color_desc, raw_type) = if raw.cpp == 1 {
            let desc = match cfa_pattern(&raw) {
                Ok(p) if raw.cfa.name.is_empty() => p.describe(),
                _ => raw.cfa.name.clone(),
            };
            (desc, RawType::Flat)
        } else {
            ("RGB".to_string(), RawType::Stack)
        };

        let pick = |clean: &str, full: &str| {
            if clean.trim().is_empty() {
                full.trim().to_string()
            } else {
                clean.trim().to_string()
            }
        };

        Ok(RawInfo {
            make: pick(&raw.clean_make, &raw.make),
            model: pick(&raw.clean_model, &raw.model),
            width: width as u32,
            height: height as u32,
            raw_width: raw.width as u32,
            raw_height: raw.height as u32,
            color_desc,
            raw_type,
        })
    }
}
