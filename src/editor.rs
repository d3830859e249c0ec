//! Hand-off to an external RAW editor (darktable by default).
//!
//! The editor is an opaque executable: [`probe`] asks it for `--version`,
//! [`launch`] starts it with the selected files as arguments and returns
//! without waiting. Each record contributes its primary file and, when
//! present, its paired file.

use crate::record::ImageRecord;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("No images to open")]
    NothingToOpen,
    #[error("Failed to start {executable}: {source}")]
    Spawn {
        executable: String,
        source: std::io::Error,
    },
}

/// Version string reported by `<executable> --version`, or `None` if the
/// executable is missing or exits unsuccessfully.
pub fn probe(executable: &str) -> Option<String> {
    let output = match Command::new(executable)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            warn!(executable, error = %e, "editor not found");
            return None;
        }
    };
    if !output.status.success() {
        warn!(
            executable,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "editor --version failed"
        );
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    info!(executable, version = %version, "editor found");
    Some(version)
}

/// Primary then paired path of each record, in order.
pub fn files_to_open(records: &[&ImageRecord]) -> Vec<PathBuf> {
    records
        .iter()
        .flat_map(|r| r.files())
        .map(Path::to_path_buf)
        .collect()
}

/// Start the editor on `records`. The child is not waited on; its output is
/// discarded.
pub fn launch(executable: &str, records: &[&ImageRecord]) -> Result<Child, EditorError> {
    let files = files_to_open(records);
    if files.is_empty() {
        warn!("no images to open in editor");
        return Err(EditorError::NothingToOpen);
    }
    info!(executable, count = files.len(), "opening images in editor");
    Command::new(executable)
        .args(&files)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| EditorError::Spawn {
            executable: executable.to_string(),
            source,
        })
}
