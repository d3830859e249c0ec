//! Shared test utilities for the imcull test suite.
//!
//! Builds throwaway shoot directories, synthetic JPEGs and catalogs so unit
//! tests can exercise the pipeline without real camera files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let shoot = shoot_dir(&["IMG_0001.CR2", "IMG_0001.JPG", "notes.txt"]);
//! let catalog = catalog_from(&[(0, false), (2, true)]);
//! ```

use crate::catalog::Catalog;
use crate::metadata::Metadata;
use crate::record::{ImageRecord, Rating};
use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Gradient test pattern.
pub fn pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode `pattern(width, height)` as an in-memory JPEG.
pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = pattern(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a JPEG whose APP1 segment carries the given EXIF fields.
pub fn jpeg_with_exif(width: u32, height: u32, fields: &[exif::Field]) -> Vec<u8> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = std::io::Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = encode_jpeg(width, height);
    let segment_len = u16::try_from(2 + 6 + tiff.len()).unwrap();
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Write a small valid JPEG file with the given dimensions.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_jpeg(width, height)).unwrap();
}

// =========================================================================
// Fixture directories
// =========================================================================

/// Create a temp directory holding the given relative file names.
///
/// JPEG-family names get a real 32×24 JPEG; everything else gets a few
/// placeholder bytes. Intermediate directories are created.
pub fn shoot_dir(files: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for name in files {
        let path = tmp.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        match crate::formats::FileKind::of(&path) {
            Some(crate::formats::FileKind::Jpeg) => write_jpeg(&path, 32, 24),
            _ => std::fs::write(&path, b"placeholder").unwrap(),
        }
    }
    tmp
}

/// File names (not paths) of every record, in catalog order.
pub fn filenames(records: &[ImageRecord]) -> Vec<&str> {
    records.iter().map(|r| r.filename.as_str()).collect()
}

/// Paired file name of a record, if any.
pub fn paired_name(record: &ImageRecord) -> Option<String> {
    record
        .paired_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
}

// =========================================================================
// Catalogs
// =========================================================================

/// Records `/shoot/IMG_000N.jpg` with no metadata.
pub fn records(count: usize) -> Vec<ImageRecord> {
    (0..count)
        .map(|i| record_at(format!("/shoot/IMG_{i:04}.jpg")))
        .collect()
}

pub fn record_at(path: impl Into<PathBuf>) -> ImageRecord {
    ImageRecord::new(path, None, Metadata::default()).unwrap()
}

/// Catalog whose records carry the given `(rating, rejected)` states.
pub fn catalog_from(states: &[(u8, bool)]) -> Catalog {
    let mut catalog = Catalog::new(records(states.len()));
    for (i, &(rating, rejected)) in states.iter().enumerate() {
        catalog.jump_to(i);
        catalog.set_rating(rating).unwrap();
        if rejected {
            catalog.toggle_rejected();
        }
    }
    catalog.jump_to(0);
    catalog
}

/// Ratings in catalog order.
pub fn ratings(catalog: &Catalog) -> Vec<Rating> {
    catalog.records().iter().map(|r| r.rating()).collect()
}
