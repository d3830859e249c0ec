//! Supported file formats.
//!
//! The extension sets are a fixed, versioned surface: anything outside them is
//! ignored by the scanner. Matching is case-insensitive and done on the
//! extension without its leading dot.
//!
//! | Family | Extensions |
//! |---|---|
//! | RAW | `arw cr2 cr3 nef orf raf rw2 dng` |
//! | JPEG | `jpg jpeg jpe jif jfif` |

use serde::Serialize;
use std::path::Path;

pub const RAW_EXTENSIONS: &[&str] = &["arw", "cr2", "cr3", "nef", "orf", "raf", "rw2", "dng"];

pub const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jpe", "jif", "jfif"];

/// Format family of a supported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Raw,
    Jpeg,
}

impl FileKind {
    /// Classify an extension (with or without a leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if RAW_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Raw)
        } else if JPEG_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// Classify a path by its extension. Paths without one are unsupported.
    pub fn of(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

pub fn is_supported(path: &Path) -> bool {
    FileKind::of(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_raw_extensions_case_insensitively() {
        assert_eq!(FileKind::from_extension("CR2"), Some(FileKind::Raw));
        assert_eq!(FileKind::from_extension(".nef"), Some(FileKind::Raw));
        assert_eq!(FileKind::from_extension("Dng"), Some(FileKind::Raw));
    }

    #[test]
    fn classifies_jpeg_variants() {
        for ext in ["jpg", "JPEG", "jpe", "JIF", "jfif"] {
            assert_eq!(FileKind::from_extension(ext), Some(FileKind::Jpeg), "{ext}");
        }
    }

    #[test]
    fn rejects_sidecars_and_other_images() {
        assert_eq!(FileKind::from_extension("xmp"), None);
        assert_eq!(FileKind::from_extension("txt"), None);
        assert_eq!(FileKind::from_extension("png"), None);
        assert_eq!(FileKind::from_extension(""), None);
    }

    #[test]
    fn path_without_extension_is_unsupported() {
        assert!(!is_supported(Path::new("/photos/README")));
        assert!(is_supported(Path::new("/photos/IMG_0001.ARW")));
    }
}
