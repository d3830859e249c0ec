//! CLI output formatting.
//!
//! Every record is displayed by its positional index and file name, with the
//! RAW/JPEG pair on the same line and metadata as indented context lines.
//! Fields that could not be determined show `—`.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! 3 images loaded
//! 001 IMG_0001.CR2 + IMG_0001.JPG
//!     Camera: Canon EOS R5
//!     Taken: 2024:05:17 10:02:11
//!     Exposure: 1/250 s, f/2.8, ISO 400, 50 mm
//!     Size: 8192 × 5464
//! ```
//!
//! ## Analyze
//!
//! ```text
//! Analyzing 3 images
//!     001 IMG_0001.CR2  412.7  sharp
//!     002 IMG_0002.NEF   18.3  blurry
//!     003 IMG_0003.JPG    0.0  blurry (no preview)
//! 3 images: 0 rated, 0 rejected, 3 analyzed, 2 blurry
//! ```
//!
//! ## Backup
//!
//! ```text
//! 2 of 3 images selected (rating >= 1, not rejected)
//! /mnt/nas/photos: 4 files
//! /media/usb: 0 files
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::analysis::AnalysisEvent;
use crate::backup::BackupReport;
use crate::catalog::Summary;
use crate::metadata::{MISSING, keys};
use crate::record::ImageRecord;
use std::path::Path;

/// Format a 0-based catalog index as 1-based, 3-digit zero-padded.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

/// `IMG_0001.CR2 + IMG_0001.JPG`, or just the file name for a lone file.
fn record_title(record: &ImageRecord) -> String {
    match record
        .paired_path
        .as_deref()
        .and_then(Path::file_name)
    {
        Some(pair) => format!("{} + {}", record.filename, pair.to_string_lossy()),
        None => record.filename.clone(),
    }
}

/// Make and model, without repeating a make the model already starts with.
fn camera(record: &ImageRecord) -> String {
    let meta = &record.metadata;
    let make = meta.get(keys::MAKE).map(|v| v.to_string());
    let model = meta.get(keys::MODEL).map(|v| v.to_string());
    match (make, model) {
        (Some(make), Some(model)) if model.starts_with(&make) => model,
        (Some(make), Some(model)) => format!("{make} {model}"),
        (Some(one), None) | (None, Some(one)) => one,
        (None, None) => MISSING.to_string(),
    }
}

/// Capture time, or the file's EXIF modification date when that is all the
/// camera wrote.
fn taken(record: &ImageRecord) -> String {
    let meta = &record.metadata;
    match meta.get(keys::DATE_TIME_ORIGINAL) {
        Some(v) => v.to_string(),
        None => meta.display(keys::DATE_TIME),
    }
}

/// Join the metadata values that exist, or `—` if none do.
fn joined(record: &ImageRecord, parts: &[(&str, &str, &str)]) -> String {
    let present: Vec<String> = parts
        .iter()
        .filter_map(|(key, prefix, suffix)| {
            record
                .metadata
                .get(key)
                .map(|v| format!("{prefix}{v}{suffix}"))
        })
        .collect();
    if present.is_empty() {
        MISSING.to_string()
    } else {
        present.join(", ")
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format scan output: a count line, then one block per record.
pub fn format_scan(records: &[ImageRecord], root: &Path) -> Vec<String> {
    if records.is_empty() {
        return vec![format!("No images found in {}", root.display())];
    }
    let mut lines = vec![format!("{} loaded", plural(records.len(), "image", "images"))];
    for (i, record) in records.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i), record_title(record)));
        let folder = record.path.parent().and_then(|p| p.strip_prefix(root).ok());
        if let Some(dir) = folder.filter(|d| !d.as_os_str().is_empty()) {
            lines.push(format!("    Folder: {}", dir.display()));
        }
        lines.push(format!("    Camera: {}", camera(record)));
        lines.push(format!("    Taken: {}", taken(record)));
        lines.push(format!(
            "    Exposure: {}",
            joined(
                record,
                &[
                    (keys::EXPOSURE_TIME, "", " s"),
                    (keys::F_NUMBER, "f/", ""),
                    (keys::ISO, "ISO ", ""),
                    (keys::FOCAL_LENGTH, "", " mm"),
                ],
            )
        ));
        let size = match record.metadata.dimensions() {
            Some((w, h)) => format!("{w} × {h}"),
            None => MISSING.to_string(),
        };
        lines.push(format!("    Size: {size}"));
    }
    lines
}

pub fn print_scan(records: &[ImageRecord], root: &Path) {
    for line in format_scan(records, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Analysis output
// ============================================================================

pub fn format_analysis_event(event: &AnalysisEvent) -> Vec<String> {
    match event {
        AnalysisEvent::Started { total } => {
            vec![format!("Analyzing {}", plural(*total, "image", "images"))]
        }
        AnalysisEvent::Analyzed {
            index,
            filename,
            score,
            is_blurry,
            has_thumbnail,
        } => {
            let verdict = match (*is_blurry, *has_thumbnail) {
                (_, false) => "blurry (no preview)",
                (true, true) => "blurry",
                (false, true) => "sharp",
            };
            vec![format!(
                "    {} {}  {:>8.1}  {}",
                format_index(*index),
                filename,
                score,
                verdict
            )]
        }
        AnalysisEvent::Cancelled { remaining } => vec![format!(
            "Analysis cancelled, {} left unanalyzed",
            plural(*remaining, "image", "images")
        )],
        AnalysisEvent::Finished { analyzed: 0 } => vec!["Nothing to analyze".to_string()],
        AnalysisEvent::Finished { .. } => Vec::new(),
    }
}

pub fn format_summary(summary: &Summary) -> Vec<String> {
    vec![format!(
        "{}: {} rated, {} rejected, {} analyzed, {} blurry",
        plural(summary.total, "image", "images"),
        summary.rated,
        summary.rejected,
        summary.analyzed,
        summary.blurry
    )]
}

pub fn print_summary(summary: &Summary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Backup and editor output
// ============================================================================

/// How many images passed the rating and reject filter. Scanned images are
/// unrated, so an empty selection with a non-zero minimum gets a hint.
pub fn format_selection(selected: usize, total: usize, min_rating: u8) -> Vec<String> {
    let mut lines = vec![format!(
        "{} of {} selected (rating >= {}, not rejected)",
        selected,
        plural(total, "image", "images"),
        min_rating
    )];
    if selected == 0 && total > 0 && min_rating > 0 {
        lines.push(
            "    Scanned images are unrated; pass --min-rating 0 to take them all".to_string(),
        );
    }
    lines
}

pub fn print_selection(selected: usize, total: usize, min_rating: u8) {
    for line in format_selection(selected, total, min_rating) {
        println!("{}", line);
    }
}

pub fn format_backup(report: &BackupReport) -> Vec<String> {
    if report.is_empty() {
        return vec!["Nothing backed up".to_string()];
    }
    report
        .iter()
        .map(|(dest, files)| {
            format!("{}: {}", dest.display(), plural(files.len(), "file", "files"))
        })
        .collect()
}

pub fn print_backup(report: &BackupReport) {
    for line in format_backup(report) {
        println!("{}", line);
    }
}

pub fn format_editor_launch(executable: &str, version: Option<&str>, files: usize) -> Vec<String> {
    vec![format!(
        "Opened {} in {} ({})",
        plural(files, "file", "files"),
        executable,
        version.unwrap_or("version unknown")
    )]
}

pub fn print_editor_launch(executable: &str, version: Option<&str>, files: usize) {
    for line in format_editor_launch(executable, version, files) {
        println!("{}", line);
    }
}
