//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! user file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `<config_dir>/imcull/config.toml` (e.g. `~/.config/imcull/config.toml` on
//! Linux), or whatever `--config` points at. A missing file means defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [import]
//! default_source_dir = ""        # Directory used when none is given
//! backup_locations = []          # Backup destination roots
//!
//! [culling]
//! blur_threshold = 100.0         # Laplacian variance below this is blurry
//! preview_max_width = 1600       # Analysis preview bounding box
//! preview_max_height = 1200
//! min_preview_edge = 1000        # Smaller embedded previews are not trusted
//! default_min_rating = 1         # Minimum rating for the selection
//! date_subfolder = true          # Back up into a YYYY-MM-DD folder
//!
//! [editor]
//! enabled = true
//! executable = "darktable"
//!
//! [processing]
//! max_workers = 4                # Omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{BlurDetector, ThumbnailConfig};
use crate::record::Rating;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImcullConfig {
    pub import: ImportConfig,
    pub culling: CullingConfig,
    pub editor: EditorConfig,
    pub processing: ProcessingConfig,
}

impl ImcullConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.culling;
        if !c.blur_threshold.is_finite() || c.blur_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "culling.blur_threshold must be a finite number >= 0".into(),
            ));
        }
        if c.preview_max_width == 0 || c.preview_max_height == 0 {
            return Err(ConfigError::Validation(
                "culling.preview_max_width and preview_max_height must be non-zero".into(),
            ));
        }
        if c.default_min_rating > Rating::MAX {
            return Err(ConfigError::Validation(format!(
                "culling.default_min_rating must be 0-{}",
                Rating::MAX
            )));
        }
        if self.editor.enabled && self.editor.executable.trim().is_empty() {
            return Err(ConfigError::Validation(
                "editor.executable must not be empty when the editor is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn detector(&self) -> BlurDetector {
        BlurDetector::new(self.culling.blur_threshold)
    }

    /// Minimum rating for selection: `flag` when given, else
    /// `culling.default_min_rating`.
    pub fn min_rating(&self, flag: Option<u8>) -> Result<u8, ConfigError> {
        match flag {
            Some(r) if r > Rating::MAX => Err(ConfigError::Validation(format!(
                "--min-rating must be 0-{}, got {r}",
                Rating::MAX
            ))),
            Some(r) => Ok(r),
            None => Ok(self.culling.default_min_rating),
        }
    }

    pub fn thumbnail_config(&self) -> ThumbnailConfig {
        ThumbnailConfig {
            max_size: (self.culling.preview_max_width, self.culling.preview_max_height),
            min_preview_edge: self.culling.min_preview_edge,
        }
    }
}

/// Source and backup locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Directory scanned when the CLI is given none. Empty means unset.
    pub default_source_dir: String,
    /// Backup destination roots. `~/` is expanded.
    pub backup_locations: Vec<String>,
}

/// Blur detection, preview and selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CullingConfig {
    pub blur_threshold: f64,
    pub preview_max_width: u32,
    pub preview_max_height: u32,
    /// Embedded RAW previews with either edge shorter than this are
    /// replaced by a full develop.
    pub min_preview_edge: u32,
    /// Rating an image needs to be selected for backup or the editor.
    pub default_min_rating: u8,
    pub date_subfolder: bool,
}

impl Default for CullingConfig {
    fn default() -> Self {
        let thumbnails = ThumbnailConfig::default();
        Self {
            blur_threshold: crate::imaging::DEFAULT_BLUR_THRESHOLD,
            preview_max_width: thumbnails.max_size.0,
            preview_max_height: thumbnails.max_size.1,
            min_preview_edge: thumbnails.min_preview_edge,
            default_min_rating: 1,
            date_subfolder: true,
        }
    }
}

/// External editor hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub enabled: bool,
    pub executable: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: "darktable".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel analysis workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ImcullConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// `<config_dir>/imcull/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("imcull").join("config.toml"))
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ImcullConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ImcullConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or from [`default_config_path`] when `None`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<ImcullConfig, ConfigError> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(),
    };
    let overlay = match path {
        Some(p) => load_raw_config(&p)?,
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ImCull Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Default location: <config_dir>/imcull/config.toml
# (e.g. ~/.config/imcull/config.toml). Override with --config.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Import and backup
# ---------------------------------------------------------------------------
[import]
# Directory scanned when no directory is given on the command line.
# Empty means unset.
default_source_dir = ""

# Backup destination roots. Missing directories are created; unwritable
# ones are skipped with a warning. "~/" expands to your home directory.
# Example: backup_locations = ["/mnt/nas/photos", "~/Backups/photos"]
backup_locations = []

# ---------------------------------------------------------------------------
# Culling
# ---------------------------------------------------------------------------
[culling]
# Focus threshold. Images whose Laplacian variance is below this are flagged
# blurry. Higher values are stricter.
blur_threshold = 100.0

# Bounding box for the analysis preview. Larger previews are shrunk to fit,
# keeping aspect ratio. Smaller ones are never enlarged.
preview_max_width = 1600
preview_max_height = 1200

# RAW files: an embedded preview with either edge shorter than this is
# ignored and the RAW is developed instead.
min_preview_edge = 1000

# Minimum star rating (0-3) for an image to count as selected by backup and
# open. Scanned images start unrated, so 0 takes every image not rejected.
# The --min-rating flag overrides this.
default_min_rating = 1

# Back up into a YYYY-MM-DD subfolder of each destination.
date_subfolder = true

# ---------------------------------------------------------------------------
# External editor
# ---------------------------------------------------------------------------
[editor]
enabled = true

# Executable launched with the selected files (and their RAW/JPEG pairs).
executable = "darktable"

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel analysis workers. Omit to use all CPU cores.
# Values larger than the core count are clamped down.
# max_workers = 4
"##
}
