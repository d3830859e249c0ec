//! The image record: one logical subject on disk.
//!
//! A RAW file and its same-subject JPEG collapse into a single [`ImageRecord`]
//! whose `path` is the RAW (the *primary* file) and whose `paired_path` is the
//! JPEG. Identity fields are public and fixed at scan time. Culling state
//! (`rating`, `rejected`) and analysis results are private: only the
//! [`Catalog`](crate::catalog::Catalog) mutates them.
//!
//! ## Revisions
//!
//! Every analysis write bumps a per-record revision counter. A display layer
//! that cached a thumbnail at revision `n` knows a newer one is ready as soon
//! as it observes a revision greater than `n`, without any cross-record
//! ordering.

use crate::formats::FileKind;
use crate::metadata::Metadata;
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("rating must be between 0 and {max}, got {0}", max = Rating::MAX)]
pub struct InvalidRating(pub u8);

/// Operator rating. `0` means unrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 3;
    pub const UNRATED: Rating = Rating(0);

    pub fn new(value: u8) -> Result<Self, InvalidRating> {
        if value > Self::MAX {
            return Err(InvalidRating(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_rated(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<u8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            f.write_str("-")
        } else {
            write!(f, "{}", "*".repeat(self.0 as usize))
        }
    }
}

/// Result of one analysis pass over a record.
///
/// `blur_score` is only comparable within one threshold/preview-size
/// configuration; it is not a normalized sharpness unit.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub blur_score: f64,
    pub is_blurry: bool,
    /// Bounded-size RGB preview, shared with the display layer.
    #[serde(skip)]
    pub thumbnail: Option<Arc<RgbImage>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// Primary file: the RAW when a pair exists, otherwise the lone file.
    pub path: PathBuf,
    pub filename: String,
    /// File name without its extension.
    pub base_name: String,
    /// Extension as found on disk, without the dot (case preserved).
    pub extension: String,
    pub kind: FileKind,
    /// Secondary file sharing the same subject (usually the JPEG sibling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_path: Option<PathBuf>,
    pub metadata: Metadata,
    rating: Rating,
    rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<Analysis>,
    #[serde(skip)]
    revision: u64,
}

impl ImageRecord {
    /// Build a record for `path`. Returns `None` for unsupported files.
    pub fn new(path: impl Into<PathBuf>, paired_path: Option<PathBuf>, metadata: Metadata) -> Option<Self> {
        let path = path.into();
        let kind = FileKind::of(&path)?;
        let filename = path.file_name()?.to_string_lossy().into_owned();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(Self {
            path,
            filename,
            base_name,
            extension,
            kind,
            paired_path,
            metadata,
            rating: Rating::UNRATED,
            rejected: false,
            analysis: None,
            revision: 0,
        })
    }

    pub fn is_raw(&self) -> bool {
        self.kind == FileKind::Raw
    }

    pub fn is_jpeg(&self) -> bool {
        self.kind == FileKind::Jpeg
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn blur_score(&self) -> Option<f64> {
        self.analysis.as_ref().map(|a| a.blur_score)
    }

    pub fn is_blurry(&self) -> Option<bool> {
        self.analysis.as_ref().map(|a| a.is_blurry)
    }

    pub fn thumbnail(&self) -> Option<&Arc<RgbImage>> {
        self.analysis.as_ref().and_then(|a| a.thumbnail.as_ref())
    }

    /// Monotonic counter bumped on every analysis write.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The primary path followed by the paired path, if any.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.paired_path.as_deref())
    }

    pub(crate) fn set_rating(&mut self, rating: Rating) {
        self.rating = rating;
    }

    pub(crate) fn set_rejected(&mut self, rejected: bool) {
        self.rejected = rejected;
    }

    /// Replace (never accumulate) the analysis result.
    pub(crate) fn set_analysis(&mut self, analysis: Analysis) {
        self.analysis = Some(analysis);
        self.revision += 1;
    }
}
