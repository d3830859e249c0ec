//! Decode backend trait and shared types.
//!
//! The [`DecodeBackend`] trait is the seam between the culling pipeline and
//! the pixel decoders. It covers the five things the pipeline ever asks of a
//! decoder: decode a JPEG-family file, read its dimensions, develop a RAW,
//! pull a RAW's embedded preview, and describe a RAW's sensor.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, no system
//! libraries. Tests use the recording `MockBackend` below.

use image::{ImageFormat, RgbImage};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("RAW decode failed for {path}: {reason}")]
    Raw { path: PathBuf, reason: String },
    #[error("No embedded preview found in {0}")]
    NoPreview(PathBuf),
    #[error("Unsupported sensor layout: {0}")]
    UnsupportedLayout(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Demosaic quality for RAW development.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Demosaic {
    /// Neighbourhood averaging. Works on any colour filter layout.
    #[default]
    Bilinear,
    /// Gradient-corrected interpolation for 2×2 Bayer sensors. Slower, keeps
    /// the edge detail a focus measure depends on.
    HighQuality,
}

/// How sensor samples are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawType {
    /// One sample per photosite behind a colour filter array.
    Flat,
    /// Several colour samples per pixel (linear DNG and friends).
    Stack,
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("Flat"),
            Self::Stack => f.write_str("Stack"),
        }
    }
}

/// Sensor-level description of a RAW file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInfo {
    pub make: String,
    pub model: String,
    /// Developed (cropped) image size.
    pub width: u32,
    pub height: u32,
    /// Full sensor array size before cropping.
    pub raw_width: u32,
    pub raw_height: u32,
    /// Colour filter description, e.g. `RGGB`.
    pub color_desc: String,
    pub raw_type: RawType,
}

/// Encoded preview image embedded inside a RAW container.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedPreview {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

/// Trait for decode backends.
///
/// Every method may fail; callers decide whether a failure degrades to a
/// fallback or to an absent result.
pub trait DecodeBackend: Sync {
    /// Decode a JPEG-family (or any non-RAW) file to RGB.
    fn decode(&self, path: &Path) -> Result<RgbImage, DecodeError>;

    /// Read pixel dimensions without a full decode.
    fn dimensions(&self, path: &Path) -> Result<Dimensions, DecodeError>;

    /// Develop a RAW file at full resolution with camera white balance and no
    /// automatic brightening.
    fn decode_raw(&self, path: &Path, demosaic: Demosaic) -> Result<RgbImage, DecodeError>;

    /// Extract the largest embedded preview image from a RAW container.
    fn extract_preview(&self, path: &Path) -> Result<EmbeddedPreview, DecodeError>;

    /// Describe a RAW file's camera and sensor.
    fn raw_info(&self, path: &Path) -> Result<RawInfo, DecodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations and replays scripted results.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub decoded: Mutex<Vec<RgbImage>>,
        pub developed: Mutex<Vec<RgbImage>>,
        pub previews: Mutex<Vec<EmbeddedPreview>>,
        pub dimensions: Mutex<Vec<Dimensions>>,
        pub raw_infos: Mutex<Vec<RawInfo>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Dimensions(String),
        DecodeRaw { path: String, demosaic: Demosaic },
        ExtractPreview(String),
        RawInfo(String),
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_decoded(self, img: RgbImage) -> Self {
            self.decoded.lock().unwrap().push(img);
            self
        }

        pub fn with_developed(self, img: RgbImage) -> Self {
            self.developed.lock().unwrap().push(img);
            self
        }

        pub fn with_preview(self, preview: EmbeddedPreview) -> Self {
            self.previews.lock().unwrap().push(preview);
            self
        }

        pub fn with_dimensions(self, dims: Dimensions) -> Self {
            self.dimensions.lock().unwrap().push(dims);
            self
        }

        pub fn with_raw_info(self, info: RawInfo) -> Self {
            self.raw_infos.lock().unwrap().push(info);
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    fn pop<T>(slot: &Mutex<Vec<T>>, what: &str) -> Result<T, DecodeError> {
        slot.lock()
            .unwrap()
            .pop()
            .ok_or_else(|| DecodeError::ProcessingFailed(format!("No mock {what}")))
    }

    fn lossy(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    impl DecodeBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<RgbImage, DecodeError> {
            self.record(RecordedOp::Decode(lossy(path)));
            pop(&self.decoded, "decoded image")
        }

        fn dimensions(&self, path: &Path) -> Result<Dimensions, DecodeError> {
            self.record(RecordedOp::Dimensions(lossy(path)));
            pop(&self.dimensions, "dimensions")
        }

        fn decode_raw(&self, path: &Path, demosaic: Demosaic) -> Result<RgbImage, DecodeError> {
            self.record(RecordedOp::DecodeRaw {
                path: lossy(path),
                demosaic,
            });
            pop(&self.developed, "developed RAW")
        }

        fn extract_preview(&self, path: &Path) -> Result<EmbeddedPreview, DecodeError> {
            self.record(RecordedOp::ExtractPreview(lossy(path)));
            self.previews
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| DecodeError::NoPreview(path.to_path_buf()))
        }

        fn raw_info(&self, path: &Path) -> Result<RawInfo, DecodeError> {
            self.record(RecordedOp::RawInfo(lossy(path)));
            pop(&self.raw_infos, "RAW info")
        }
    }

    #[test]
    fn mock_records_decode_raw_quality() {
        let backend = MockBackend::new().with_developed(RgbImage::new(4, 4));

        let img = backend
            .decode_raw(Path::new("/shoot/a.nef"), Demosaic::HighQuality)
            .unwrap();
        assert_eq!(img.dimensions(), (4, 4));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::DecodeRaw { path, demosaic: Demosaic::HighQuality } if path == "/shoot/a.nef"
        ));
    }

    #[test]
    fn mock_without_preview_reports_no_preview() {
        let backend = MockBackend::new();
        let err = backend.extract_preview(Path::new("/shoot/a.cr2")).unwrap_err();
        assert!(matches!(err, DecodeError::NoPreview(_)));
    }

    #[test]
    fn raw_type_display() {
        assert_eq!(RawType::Flat.to_string(), "Flat");
        assert_eq!(RawType::Stack.to_string(), "Stack");
    }
}
