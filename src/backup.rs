//! Backup dispatcher: copy culled images to one or more destination roots.
//!
//! Destinations are validated once, when the dispatcher is built:
//! missing directories are created, directories that cannot be written are
//! excluded with a warning and never attempted. `~/` is expanded to the home
//! directory.
//!
//! A run copies each record's primary file and its pair (if any) into every
//! destination, optionally under a `YYYY-MM-DD` subfolder. The date is taken
//! once per run, so a run that crosses midnight still lands in one folder.
//! Copies keep the source modification time.
//!
//! Everything is best effort. A file that fails to copy is logged and
//! skipped; the rest of the run continues. The result lists, per destination,
//! only the files that were actually written.

use crate::record::ImageRecord;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

pub const DATE_SUBFOLDER_FORMAT: &str = "%Y-%m-%d";

const WRITE_PROBE: &str = ".imcull-write-probe";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Destination not writable: {path}: {source}")]
    NotWritable { path: PathBuf, source: io::Error },
    #[error("Destination already configured: {0}")]
    Duplicate(PathBuf),
}

/// Per-destination list of written files.
pub type BackupReport = BTreeMap<PathBuf, Vec<PathBuf>>;

#[derive(Debug, Default)]
pub struct BackupDispatcher {
    locations: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(location: &Path) -> PathBuf {
    let Ok(rest) = location.strip_prefix("~") else {
        return location.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => location.to_path_buf(),
    }
}

/// Create `path` if missing, then prove it accepts new files.
fn prepare_destination(path: &Path) -> Result<(), BackupError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| BackupError::NotWritable {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "created backup location");
    }
    if !path.is_dir() {
        return Err(BackupError::NotADirectory(path.to_path_buf()));
    }
    let probe = path.join(WRITE_PROBE);
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .map_err(|source| BackupError::NotWritable {
            path: path.to_path_buf(),
            source,
        })?;
    fs::remove_file(&probe).ok();
    Ok(())
}

/// Copy one file, keeping its modification time where the destination
/// allows it. The copy counts once its bytes are written.
fn copy_preserving(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest)?;
    if let Err(e) = preserve_mtime(src, dest) {
        warn!(dest = %dest.display(), error = %e, "copied without original modification time");
    }
    Ok(())
}

fn preserve_mtime(src: &Path, dest: &Path) -> io::Result<()> {
    let modified = fs::metadata(src)?.modified()?;
    fs::File::options().write(true).open(dest)?.set_modified(modified)
}

pub fn date_subfolder(now: DateTime<Local>) -> String {
    now.format(DATE_SUBFOLDER_FORMAT).to_string()
}

impl BackupDispatcher {
    /// Validate `locations`. Invalid ones are remembered as excluded and
    /// reported with an empty list by [`backup`](Self::backup).
    pub fn new<P: AsRef<Path>>(locations: &[P]) -> Self {
        let mut dispatcher = Self::default();
        for location in locations {
            let path = expand_home(location.as_ref());
            if dispatcher.locations.contains(&path) || dispatcher.excluded.contains(&path) {
                continue;
            }
            match prepare_destination(&path) {
                Ok(()) => dispatcher.locations.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "excluding backup location");
                    dispatcher.excluded.push(path);
                }
            }
        }
        dispatcher
    }

    /// Usable destinations, in configuration order.
    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    pub fn excluded(&self) -> &[PathBuf] {
        &self.excluded
    }

    /// Add a destination, creating it if needed. Returns the expanded path.
    pub fn add_location(&mut self, location: impl AsRef<Path>) -> Result<PathBuf, BackupError> {
        let path = expand_home(location.as_ref());
        if self.locations.contains(&path) {
            return Err(BackupError::Duplicate(path));
        }
        prepare_destination(&path)?;
        self.excluded.retain(|p| p != &path);
        self.locations.push(path.clone());
        Ok(path)
    }

    /// Forget a destination. Returns whether it was configured.
    pub fn remove_location(&mut self, location: impl AsRef<Path>) -> bool {
        let path = expand_home(location.as_ref());
        let before = self.locations.len() + self.excluded.len();
        self.locations.retain(|p| p != &path);
        self.excluded.retain(|p| p != &path);
        before != self.locations.len() + self.excluded.len()
    }

    /// Copy `records` (primary plus pair) into every usable destination.
    pub fn backup(&self, records: &[&ImageRecord], use_date_subfolder: bool) -> BackupReport {
        let folder = use_date_subfolder.then(|| date_subfolder(Local::now()));
        self.backup_into(records, folder.as_deref())
    }

    fn backup_into(&self, records: &[&ImageRecord], folder: Option<&str>) -> BackupReport {
        if records.is_empty() {
            warn!("no images to back up");
            return BackupReport::new();
        }
        if self.locations.is_empty() {
            warn!("no usable backup locations");
        }

        let mut report: BackupReport = self
            .excluded
            .iter()
            .map(|p| (p.clone(), Vec::new()))
            .collect();

        for location in &self.locations {
            let target = match folder {
                Some(name) => location.join(name),
                None => location.clone(),
            };
            let written = match fs::create_dir_all(&target) {
                Ok(()) => copy_records(records, &target),
                Err(e) => {
                    error!(path = %target.display(), error = %e, "cannot create backup folder");
                    Vec::new()
                }
            };
            info!(count = written.len(), target = %target.display(), "backed up files");
            report.insert(location.clone(), written);
        }
        report
    }
}

fn copy_records(records: &[&ImageRecord], target: &Path) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for record in records {
        for src in record.files() {
            let Some(name) = src.file_name() else {
                continue;
            };
            let dest = target.join(name);
            match copy_preserving(src, &dest) {
                Ok(()) => written.push(dest),
                Err(e) => error!(
                    src = %src.display(),
                    target = %target.display(),
                    error = %e,
                    "backup copy failed"
                ),
            }
        }
    }
    written
}

/// One-shot backup: validate `destinations`, then copy.
pub fn backup<P: AsRef<Path>>(
    records: &[&ImageRecord],
    destinations: &[P],
    use_date_subfolder: bool,
) -> BackupReport {
    BackupDispatcher::new(destinations).backup(records, use_date_subfolder)
}
