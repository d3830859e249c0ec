//! Image metadata extraction.
//!
//! Metadata is a flat, best-effort mapping from tag name to [`MetaValue`].
//! Which keys exist depends on the file format and on which extraction stage
//! managed to read something; absence is normal and never an error.
//!
//! ## Stages
//!
//! Extraction runs four stages in order. Each stage only fills keys the
//! earlier ones left empty, and each is isolated: a failure is logged and the
//! next stage still runs.
//!
//! 1. **EXIF** over the file's container (JPEG, and the TIFF-based RAWs):
//!    capture time, exposure, aperture, ISO, focal length, camera, GPS (all
//!    `GPS *` tags verbatim), pixel size, colour space, lens.
//! 2. **RAW sensor** (RAW files only): camera and sensor description from the
//!    RAW decoder, then the embedded preview JPEG's size and its own EXIF,
//!    mapped through a fixed tag table.
//! 3. **Pixel size** (non-RAW files still missing it): from the image header.
//! 4. **Filesystem**: size in bytes and modification time, always.
//!
//! ## Display
//!
//! [`Metadata::display`] renders a key for a UI or CLI, with `—` standing in
//! for anything that could not be determined.

use crate::formats::FileKind;
use crate::imaging::{DecodeBackend, DecodeError, RawType};
use chrono::{DateTime, Local};
use exif::{Context, Exif, Field, In, Tag, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::{debug, warn};

/// Well-known metadata keys.
pub mod keys {
    pub const DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
    pub const DATE_TIME: &str = "DateTime";
    pub const EXPOSURE_TIME: &str = "ExposureTime";
    pub const F_NUMBER: &str = "FNumber";
    pub const ISO: &str = "ISOSpeedRatings";
    pub const FOCAL_LENGTH: &str = "FocalLength";
    pub const MAKE: &str = "Make";
    pub const MODEL: &str = "Model";
    pub const WIDTH: &str = "ExifImageWidth";
    pub const HEIGHT: &str = "ExifImageHeight";
    pub const COLOR_SPACE: &str = "ColorSpace";
    pub const LENS_MODEL: &str = "LensModel";
    pub const LENS: &str = "Lens";
    pub const RAW_TYPE: &str = "RawType";
    pub const RAW_DIMENSIONS: &str = "RawDimensions";
    pub const THUMB_SOURCE: &str = "ThumbSource";
    pub const FILE_SIZE: &str = "FileSize";
    pub const FILE_MOD_TIME: &str = "FileModTime";
    pub const GPS_PREFIX: &str = "GPS ";
}

/// Placeholder shown for keys that could not be determined.
pub const MISSING: &str = "—";

/// Format of [`keys::FILE_MOD_TIME`].
pub const MOD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Value recorded under a `ThumbSource` key when the embedded preview
/// supplied the pixel size.
pub const EMBEDDED_JPEG: &str = "Embedded JPEG";

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    Integer(i64),
    Float(f64),
    /// EXIF rationals as `(numerator, denominator)` pairs.
    Rationals(Vec<(i64, i64)>),
}

impl MetaValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Rationals(r) => match r.as_slice() {
                [(n, d)] if *d != 0 && n % d == 0 => Some(n / d),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for MetaValue {
    fn from(v: u32) -> Self {
        Self::Integer(v as i64)
    }
}

fn fmt_rational(f: &mut fmt::Formatter<'_>, (num, den): (i64, i64)) -> fmt::Result {
    if den == 0 {
        write!(f, "{num}/0")
    } else if num % den == 0 {
        write!(f, "{}", num / den)
    } else if num.abs() == 1 || num.abs() < den {
        // Shutter-speed style: 1/250
        write!(f, "{num}/{den}")
    } else {
        let v = num as f64 / den as f64;
        let s = format!("{v:.2}");
        f.write_str(s.trim_end_matches('0').trim_end_matches('.'))
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Rationals(values) => {
                for (i, &r) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_rational(f, r)?;
                }
                Ok(())
            }
        }
    }
}

/// Flat metadata mapping. Keys are ordered for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert unless the key already has a value. Returns whether it was
    /// inserted.
    pub fn fill(&mut self, key: &str, value: impl Into<MetaValue>) -> bool {
        if self.0.contains_key(key) {
            return false;
        }
        self.0.insert(key.to_string(), value.into());
        true
    }

    /// Insert, replacing any existing value.
    pub fn set(&mut self, key: &str, value: impl Into<MetaValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render `key` for display, `—` when absent.
    pub fn display(&self, key: &str) -> String {
        self.get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| MISSING.to_string())
    }

    /// Pixel size, when both edges are known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let w = self.get(keys::WIDTH)?.as_integer()?;
        let h = self.get(keys::HEIGHT)?.as_integer()?;
        Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?))
    }

    pub fn has_dimensions(&self) -> bool {
        self.dimensions().is_some_and(|(w, h)| w > 0 && h > 0)
    }

    fn fill_dimensions(&mut self, width: u32, height: u32) -> bool {
        if self.has_dimensions() {
            return false;
        }
        self.set(keys::WIDTH, width);
        self.set(keys::HEIGHT, height);
        true
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract everything we can about `path`. Never fails.
pub fn extract(backend: &impl DecodeBackend, path: &Path) -> Metadata {
    let mut meta = Metadata::new();
    let kind = FileKind::of(path);

    if let Err(e) = read_exif_file(path).map(|exif| apply_exif(&mut meta, &exif)) {
        debug!(path = %path.display(), error = %e, "no EXIF from container");
    }

    if kind == Some(FileKind::Raw) {
        if let Err(e) = apply_raw_info(backend, path, &mut meta) {
            warn!(path = %path.display(), error = %e, "RAW metadata extraction failed");
        }
        if let Err(e) = apply_embedded_preview(backend, path, &mut meta) {
            debug!(path = %path.display(), error = %e, "embedded preview metadata unavailable");
        }
    } else if !meta.has_dimensions() {
        match backend.dimensions(path) {
            Ok(dims) => {
                meta.fill_dimensions(dims.width, dims.height);
            }
            Err(e) => debug!(path = %path.display(), error = %e, "could not read dimensions"),
        }
    }

    if let Err(e) = apply_file_stats(path, &mut meta) {
        warn!(path = %path.display(), error = %e, "failed to stat file");
    }

    meta
}

#[derive(Debug, thiserror::Error)]
enum StageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Exif(#[from] exif::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

fn read_exif_file(path: &Path) -> Result<Exif, StageError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    Ok(exif::Reader::new().read_from_container(&mut reader)?)
}

/// Convert an EXIF field value into a [`MetaValue`].
fn meta_value(field: &Field) -> Option<MetaValue> {
    let value = match &field.value {
        Value::Ascii(strings) => {
            let s = strings
                .first()
                .map(|raw| String::from_utf8_lossy(raw).trim_matches('\0').trim().to_string())?;
            if s.is_empty() {
                return None;
            }
            MetaValue::Text(s)
        }
        Value::Rational(values) if !values.is_empty() => MetaValue::Rationals(
            values
                .iter()
                .map(|r| (r.num as i64, r.denom as i64))
                .collect(),
        ),
        Value::SRational(values) if !values.is_empty() => MetaValue::Rationals(
            values
                .iter()
                .map(|r| (r.num as i64, r.denom as i64))
                .collect(),
        ),
        Value::Float(values) if values.len() == 1 => MetaValue::Float(values[0] as f64),
        Value::Double(values) if values.len() == 1 => MetaValue::Float(values[0]),
        Value::Byte(_) | Value::Short(_) | Value::Long(_) | Value::SByte(_)
        | Value::SShort(_) | Value::SLong(_) => match integers(&field.value).as_slice() {
            [single] => MetaValue::Integer(*single),
            [] => return None,
            _ => MetaValue::Text(field.display_value().to_string()),
        },
        _ => MetaValue::Text(field.display_value().to_string()),
    };
    Some(value)
}

fn integers(value: &Value) -> Vec<i64> {
    match value {
        Value::Byte(v) => v.iter().map(|&x| x as i64).collect(),
        Value::Short(v) => v.iter().map(|&x| x as i64).collect(),
        Value::Long(v) => v.iter().map(|&x| x as i64).collect(),
        Value::SByte(v) => v.iter().map(|&x| x as i64).collect(),
        Value::SShort(v) => v.iter().map(|&x| x as i64).collect(),
        Value::SLong(v) => v.iter().map(|&x| x as i64).collect(),
        _ => Vec::new(),
    }
}

fn primary(exif: &Exif, tag: Tag) -> Option<MetaValue> {
    exif.get_field(tag, In::PRIMARY).and_then(meta_value)
}

fn primary_uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
}

/// Stage 1: the standard EXIF vocabulary.
fn apply_exif(meta: &mut Metadata, exif: &Exif) {
    if let Some(v) = primary(exif, Tag::DateTimeOriginal) {
        meta.fill(keys::DATE_TIME_ORIGINAL, v);
    } else if let Some(v) = primary(exif, Tag::DateTime) {
        meta.fill(keys::DATE_TIME, v);
    }

    let simple = [
        (Tag::ExposureTime, keys::EXPOSURE_TIME),
        (Tag::FNumber, keys::F_NUMBER),
        (Tag::PhotographicSensitivity, keys::ISO),
        (Tag::FocalLength, keys::FOCAL_LENGTH),
        (Tag::Model, keys::MODEL),
        (Tag::Make, keys::MAKE),
        (Tag::ColorSpace, keys::COLOR_SPACE),
    ];
    for (tag, key) in simple {
        if let Some(v) = primary(exif, tag) {
            meta.fill(key, v);
        }
    }

    for field in exif.fields() {
        if field.ifd_num == In::PRIMARY && field.tag.context() == Context::Gps {
            if let Some(v) = meta_value(field) {
                meta.fill(&format!("{}{}", keys::GPS_PREFIX, field.tag), v);
            }
        }
    }

    let exif_dims = primary_uint(exif, Tag::PixelXDimension).zip(primary_uint(exif, Tag::PixelYDimension));
    let tiff_dims = || primary_uint(exif, Tag::ImageWidth).zip(primary_uint(exif, Tag::ImageLength));
    if let Some((w, h)) = exif_dims.or_else(tiff_dims) {
        meta.fill_dimensions(w, h);
    }

    if let Some(v) = primary(exif, Tag::LensModel) {
        meta.fill(keys::LENS_MODEL, v);
    } else if let Some(v) = primary(exif, Tag::LensSpecification) {
        meta.fill(keys::LENS, v);
    }
}

/// Stage 2a: camera and sensor from the RAW decoder.
fn apply_raw_info(
    backend: &impl DecodeBackend,
    path: &Path,
    meta: &mut Metadata,
) -> Result<(), StageError> {
    let info = backend.raw_info(path)?;

    if !info.model.is_empty() {
        meta.fill(keys::MODEL, info.model.as_str());
    }
    if !info.make.is_empty() {
        meta.fill(keys::MAKE, info.make.as_str());
    }
    meta.fill_dimensions(info.width, info.height);
    if !info.color_desc.is_empty() {
        meta.fill(keys::COLOR_SPACE, info.color_desc.as_str());
    }
    meta.fill(
        keys::RAW_TYPE,
        match info.raw_type {
            RawType::Flat => "Flat",
            RawType::Stack => "Stack",
        },
    );
    meta.fill(
        keys::RAW_DIMENSIONS,
        format!("{} × {}", info.raw_width, info.raw_height),
    );
    Ok(())
}

/// Tags read from a RAW's embedded preview, by EXIF tag number.
const PREVIEW_TAGS: &[(u16, &str)] = &[
    (0x010F, keys::MAKE),
    (0x0110, keys::MODEL),
    (0x8827, keys::ISO),
    (0x829A, keys::EXPOSURE_TIME),
    (0x829D, keys::F_NUMBER),
    (0x920A, keys::FOCAL_LENGTH),
    (0x9003, keys::DATE_TIME_ORIGINAL),
    (0x8822, "ExposureProgram"),
    (0x9204, "ExposureBiasValue"),
    (0x9207, "MeteringMode"),
    (0x9209, "Flash"),
    (0xA002, keys::WIDTH),
    (0xA003, keys::HEIGHT),
    (0xA301, "SceneType"),
    (0xA402, "ExposureMode"),
    (0xA403, "WhiteBalance"),
    (0xA406, "SceneCaptureType"),
];

/// Stage 2b: the embedded preview's pixel size and EXIF.
fn apply_embedded_preview(
    backend: &impl DecodeBackend,
    path: &Path,
    meta: &mut Metadata,
) -> Result<(), StageError> {
    let preview = backend.extract_preview(path)?;

    let (w, h) = image::ImageReader::with_format(Cursor::new(&preview.data), preview.format)
        .into_dimensions()?;
    if meta.fill_dimensions(w, h) {
        meta.fill(keys::THUMB_SOURCE, EMBEDDED_JPEG);
    }

    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(&preview.data))?;
    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY || field.tag.context() == Context::Gps {
            continue;
        }
        let number = field.tag.number();
        let Some(&(_, key)) = PREVIEW_TAGS.iter().find(|(n, _)| *n == number) else {
            continue;
        };
        if let Some(v) = meta_value(field) {
            meta.fill(key, v);
        }
    }
    Ok(())
}

/// Stage 4: size and modification time from the filesystem.
fn apply_file_stats(path: &Path, meta: &mut Metadata) -> Result<(), StageError> {
    let stat = std::fs::metadata(path)?;
    meta.set(keys::FILE_SIZE, stat.len() as i64);
    let modified: DateTime<Local> = stat.modified()?.into();
    meta.set(keys::FILE_MOD_TIME, modified.format(MOD_TIME_FORMAT).to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{Dimensions, EmbeddedPreview, RawInfo};
    use crate::test_helpers::{encode_jpeg, jpeg_with_exif, write_jpeg};
    use image::ImageFormat;
    use tempfile::TempDir;

    fn raw_info() -> RawInfo {
        RawInfo {
            make: "Nikon".into(),
            model: "D850".into(),
            width: 8256,
            height: 5504,
            raw_width: 8288,
            raw_height: 5520,
            color_desc: "RGGB".into(),
            raw_type: RawType::Flat,
        }
    }

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn ascii(s: &str) -> Value {
        Value::Ascii(vec![s.as_bytes().to_vec()])
    }

    fn rationals(values: &[(u32, u32)]) -> Value {
        Value::Rational(values.iter().map(|&r| r.into()).collect())
    }

    /// Write a JPEG carrying `fields` and extract it with a backend that
    /// knows nothing.
    fn extract_jpeg_with(fields: &[Field]) -> Metadata {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0001.JPG");
        std::fs::write(&path, jpeg_with_exif(32, 24, fields)).unwrap();
        extract(&MockBackend::new(), &path)
    }

    // =========================================================================
    // MetaValue / Metadata
    // =========================================================================

    #[test]
    fn rationals_render_for_humans() {
        assert_eq!(MetaValue::Rationals(vec![(1, 250)]).to_string(), "1/250");
        assert_eq!(MetaValue::Rationals(vec![(28, 10)]).to_string(), "2.8");
        assert_eq!(MetaValue::Rationals(vec![(50, 1)]).to_string(), "50");
        assert_eq!(
            MetaValue::Rationals(vec![(52, 1), (30, 1), (1234, 100)]).to_string(),
            "52, 30, 12.34"
        );
    }

    #[test]
    fn display_placeholder_for_missing_key() {
        let mut meta = Metadata::new();
        meta.set(keys::MAKE, "Fujifilm");
        assert_eq!(meta.display(keys::MAKE), "Fujifilm");
        assert_eq!(meta.display(keys::LENS_MODEL), "—");
    }

    #[test]
    fn fill_never_overwrites() {
        let mut meta = Metadata::new();
        assert!(meta.fill(keys::MODEL, "first"));
        assert!(!meta.fill(keys::MODEL, "second"));
        assert_eq!(meta.get(keys::MODEL), Some(&MetaValue::from("first")));
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut meta = Metadata::new();
        meta.set(keys::FILE_SIZE, 1024i64);
        meta.set(keys::F_NUMBER, MetaValue::Rationals(vec![(28, 10)]));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["FileSize"], 1024);
        assert_eq!(json["FNumber"], serde_json::json!([[28, 10]]));
    }

    // =========================================================================
    // extract
    // =========================================================================

    #[test]
    fn jpeg_without_exif_gets_header_dimensions_and_file_stats() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plain.jpg");
        write_jpeg(&path, 64, 48);

        let backend = MockBackend::new().with_dimensions(Dimensions {
            width: 64,
            height: 48,
        });
        let meta = extract(&backend, &path);

        assert_eq!(meta.dimensions(), Some((64, 48)));
        assert!(!meta.contains(keys::THUMB_SOURCE));
        let size = std::fs::metadata(&path).unwrap().len() as i64;
        assert_eq!(meta.get(keys::FILE_SIZE), Some(&MetaValue::Integer(size)));
        let mtime = meta.display(keys::FILE_MOD_TIME);
        assert_eq!(mtime.len(), "2024-01-31 12:00:00".len());
        assert!(chrono::NaiveDateTime::parse_from_str(&mtime, MOD_TIME_FORMAT).is_ok());
    }

    #[test]
    fn exif_stage_reads_standard_tags() {
        let meta = extract_jpeg_with(&[
            field(Tag::Make, ascii("Canon")),
            field(Tag::Model, ascii("Canon EOS R5")),
            field(Tag::DateTimeOriginal, ascii("2024:05:17 10:02:11")),
            field(Tag::DateTime, ascii("2024:06:01 08:00:00")),
            field(Tag::ExposureTime, rationals(&[(1, 250)])),
            field(Tag::FNumber, rationals(&[(28, 10)])),
            field(Tag::FocalLength, rationals(&[(50, 1)])),
            field(Tag::PhotographicSensitivity, Value::Short(vec![400])),
            field(Tag::ColorSpace, Value::Short(vec![1])),
        ]);

        assert_eq!(meta.display(keys::MAKE), "Canon");
        assert_eq!(meta.display(keys::MODEL), "Canon EOS R5");
        assert_eq!(meta.display(keys::DATE_TIME_ORIGINAL), "2024:05:17 10:02:11");
        assert!(!meta.contains(keys::DATE_TIME));
        assert_eq!(
            meta.get(keys::EXPOSURE_TIME),
            Some(&MetaValue::Rationals(vec![(1, 250)]))
        );
        assert_eq!(meta.display(keys::EXPOSURE_TIME), "1/250");
        assert_eq!(meta.display(keys::F_NUMBER), "2.8");
        assert_eq!(meta.display(keys::FOCAL_LENGTH), "50");
        assert_eq!(meta.get(keys::ISO), Some(&MetaValue::Integer(400)));
        assert_eq!(meta.get(keys::COLOR_SPACE), Some(&MetaValue::Integer(1)));
    }

    #[test]
    fn exif_date_falls_back_to_modification_date() {
        let meta = extract_jpeg_with(&[field(Tag::DateTime, ascii("2024:06:01 08:00:00"))]);
        assert!(!meta.contains(keys::DATE_TIME_ORIGINAL));
        assert_eq!(meta.display(keys::DATE_TIME), "2024:06:01 08:00:00");
    }

    #[test]
    fn exif_gps_tags_are_copied_with_prefix() {
        let meta = extract_jpeg_with(&[
            field(Tag::GPSLatitudeRef, ascii("N")),
            field(Tag::GPSLatitude, rationals(&[(52, 1), (30, 1), (1234, 100)])),
            field(Tag::GPSLongitudeRef, ascii("E")),
            field(Tag::GPSLongitude, rationals(&[(13, 1), (24, 1), (0, 1)])),
        ]);

        assert_eq!(meta.display("GPS GPSLatitudeRef"), "N");
        assert_eq!(meta.display("GPS GPSLatitude"), "52, 30, 12.34");
        assert_eq!(meta.display("GPS GPSLongitudeRef"), "E");
        assert_eq!(
            meta.get("GPS GPSLongitude"),
            Some(&MetaValue::Rationals(vec![(13, 1), (24, 1), (0, 1)]))
        );
    }

    #[test]
    fn exif_pixel_dimensions_win_over_header() {
        let backend = MockBackend::new().with_dimensions(Dimensions {
            width: 32,
            height: 24,
        });
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        let fields = [
            field(Tag::PixelXDimension, Value::Long(vec![6000])),
            field(Tag::PixelYDimension, Value::Long(vec![4000])),
            field(Tag::ImageWidth, Value::Long(vec![160])),
            field(Tag::ImageLength, Value::Long(vec![120])),
        ];
        std::fs::write(&path, jpeg_with_exif(32, 24, &fields)).unwrap();

        let meta = extract(&backend, &path);
        assert_eq!(meta.dimensions(), Some((6000, 4000)));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn exif_image_width_used_without_pixel_dimensions() {
        let meta = extract_jpeg_with(&[
            field(Tag::ImageWidth, Value::Short(vec![3000])),
            field(Tag::ImageLength, Value::Short(vec![2000])),
        ]);
        assert_eq!(meta.dimensions(), Some((3000, 2000)));
    }

    #[test]
    fn lens_model_preferred_over_lens_specification() {
        let spec = rationals(&[(24, 1), (70, 1), (28, 10), (28, 10)]);
        let meta = extract_jpeg_with(&[
            field(Tag::LensModel, ascii("RF24-70mm F2.8 L IS USM")),
            field(Tag::LensSpecification, spec.clone()),
        ]);
        assert_eq!(meta.display(keys::LENS_MODEL), "RF24-70mm F2.8 L IS USM");
        assert!(!meta.contains(keys::LENS));

        let meta = extract_jpeg_with(&[field(Tag::LensSpecification, spec)]);
        assert!(!meta.contains(keys::LENS_MODEL));
        assert_eq!(meta.display(keys::LENS), "24, 70, 2.8, 2.8");
    }

    #[test]
    fn blank_exif_text_is_treated_as_absent() {
        let meta = extract_jpeg_with(&[
            field(Tag::Make, ascii("  ")),
            field(Tag::Model, ascii("X-T5")),
        ]);
        assert!(!meta.contains(keys::MAKE));
        assert_eq!(meta.display(keys::MODEL), "X-T5");
    }

    #[test]
    fn embedded_preview_exif_maps_table_tags() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0002.CR3");
        std::fs::write(&path, b"container").unwrap();
        let fields = [
            field(Tag::Make, ascii("Canon")),
            field(Tag::Model, ascii("Canon EOS R6")),
            field(Tag::DateTimeOriginal, ascii("2024:05:18 07:30:00")),
            field(Tag::ExposureTime, rationals(&[(1, 125)])),
            field(Tag::FNumber, rationals(&[(4, 1)])),
            field(Tag::FocalLength, rationals(&[(85, 1)])),
            field(Tag::PhotographicSensitivity, Value::Short(vec![800])),
            field(Tag::ExposureProgram, Value::Short(vec![3])),
            field(Tag::Flash, Value::Short(vec![16])),
            field(Tag::WhiteBalance, Value::Short(vec![0])),
            field(Tag::GPSLatitudeRef, ascii("S")),
            field(Tag::LensModel, ascii("RF85mm F1.2 L USM")),
        ];
        let backend = MockBackend::new().with_preview(EmbeddedPreview {
            format: ImageFormat::Jpeg,
            data: jpeg_with_exif(160, 120, &fields),
        });

        let meta = extract(&backend, &path);

        assert_eq!(meta.display(keys::MAKE), "Canon");
        assert_eq!(meta.display(keys::MODEL), "Canon EOS R6");
        assert_eq!(meta.display(keys::DATE_TIME_ORIGINAL), "2024:05:18 07:30:00");
        assert_eq!(meta.display(keys::EXPOSURE_TIME), "1/125");
        assert_eq!(meta.display(keys::F_NUMBER), "4");
        assert_eq!(meta.display(keys::FOCAL_LENGTH), "85");
        assert_eq!(meta.get(keys::ISO), Some(&MetaValue::Integer(800)));
        assert_eq!(meta.get("ExposureProgram"), Some(&MetaValue::Integer(3)));
        assert_eq!(meta.get("Flash"), Some(&MetaValue::Integer(16)));
        assert_eq!(meta.get("WhiteBalance"), Some(&MetaValue::Integer(0)));
        // Outside the table, or GPS
        assert!(!meta.contains(keys::LENS_MODEL));
        assert!(!meta.iter().any(|(k, _)| k.starts_with(keys::GPS_PREFIX)));
        // Pixel size comes from the preview header
        assert_eq!(meta.dimensions(), Some((160, 120)));
        assert_eq!(meta.display(keys::THUMB_SOURCE), EMBEDDED_JPEG);
    }

    #[test]
    fn embedded_preview_never_overrides_sensor_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("DSC_0002.NEF");
        std::fs::write(&path, b"not really a nef").unwrap();
        let fields = [
            field(Tag::Make, ascii("Canon")),
            field(Tag::PhotographicSensitivity, Value::Short(vec![100])),
        ];
        let backend = MockBackend::new()
            .with_raw_info(raw_info())
            .with_preview(EmbeddedPreview {
                format: ImageFormat::Jpeg,
                data: jpeg_with_exif(160, 120, &fields),
            });

        let meta = extract(&backend, &path);

        assert_eq!(meta.display(keys::MAKE), "Nikon");
        assert_eq!(meta.dimensions(), Some((8256, 5504)));
        assert!(!meta.contains(keys::THUMB_SOURCE));
        assert_eq!(meta.get(keys::ISO), Some(&MetaValue::Integer(100)));
    }

    #[test]
    fn raw_stage_fills_sensor_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("DSC_0001.NEF");
        std::fs::write(&path, b"not really a nef").unwrap();

        let backend = MockBackend::new().with_raw_info(raw_info());
        let meta = extract(&backend, &path);

        assert_eq!(meta.display(keys::MAKE), "Nikon");
        assert_eq!(meta.display(keys::MODEL), "D850");
        assert_eq!(meta.dimensions(), Some((8256, 5504)));
        assert_eq!(meta.display(keys::COLOR_SPACE), "RGGB");
        assert_eq!(meta.display(keys::RAW_TYPE), "Flat");
        assert_eq!(meta.display(keys::RAW_DIMENSIONS), "8288 × 5520");
        assert!(meta.contains(keys::FILE_SIZE));
    }

    #[test]
    fn raw_preview_supplies_dimensions_when_sensor_stage_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0001.CR3");
        std::fs::write(&path, b"container").unwrap();

        let backend = MockBackend::new().with_preview(EmbeddedPreview {
            format: ImageFormat::Jpeg,
            data: encode_jpeg(160, 120),
        });
        let meta = extract(&backend, &path);

        assert_eq!(meta.dimensions(), Some((160, 120)));
        assert_eq!(meta.display(keys::THUMB_SOURCE), EMBEDDED_JPEG);
        assert!(!meta.contains(keys::MAKE));
    }

    #[test]
    fn raw_never_asks_for_header_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.orf");
        std::fs::write(&path, b"x").unwrap();

        let backend = MockBackend::new();
        let meta = extract(&backend, &path);
        assert!(!meta.has_dimensions());
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, crate::imaging::backend::tests::RecordedOp::Dimensions(_)))
        );
    }

    #[test]
    fn missing_file_yields_empty_metadata() {
        let backend = MockBackend::new();
        let meta = extract(&backend, Path::new("/nonexistent/photo.jpg"));
        assert!(meta.is_empty());
    }
}
