//! Directory scanning and RAW+JPEG pairing.
//!
//! Walks a shoot directory recursively, keeps the files whose extension is in
//! the supported RAW or JPEG sets, and collapses same-subject files into one
//! [`ImageRecord`] each.
//!
//! ## Pairing
//!
//! Files are grouped across the whole tree by a *pairing key*:
//!
//! ```text
//! DCIM/100CANON/
//! ├── IMG_0001.CR2     ┐ key IMG_0001 → one record, CR2 primary, JPG paired
//! ├── IMG_0001.JPG     ┘
//! ├── IMG_0003.CR2     ┐ key IMG_0003 → camera suffix after the RAW's name
//! ├── IMG_0003_1.JPG   ┘
//! ├── IMG_0004.JPG       key IMG_0004 → lone JPEG
//! └── notes.txt          ignored
//! ```
//!
//! A RAW's key is its file stem. A JPEG's key is the RAW stem it extends at
//! an underscore boundary (`IMG_0003_1` → `IMG_0003`), or its own stem when
//! no RAW matches. RAW stems in the JPEG's own directory are tried before the
//! rest of the tree. Within a group the RAW is primary and the JPEG becomes
//! its pair.
//!
//! Same-directory matches come first, so `RAW/` and `JPG/` folders from one
//! card pair up while two cards with reused names in sibling folders do not
//! cross. Files left without a partner in their own directory pair with the
//! leftovers of other directories in path order. Several RAWs or several
//! JPEGs of one key in a single directory keep the last in path order and
//! log the collision.
//!
//! Output is sorted by primary path, so a scan of the same directory always
//! yields the same sequence.

use crate::cancel::CancelToken;
use crate::formats::FileKind;
use crate::imaging::DecodeBackend;
use crate::metadata;
use crate::record::ImageRecord;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Scan cancelled")]
    Cancelled,
}

/// One logical subject before metadata extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub primary: PathBuf,
    pub paired: Option<PathBuf>,
}

/// Scan `root`, returning an empty sequence (with the reason logged) when it
/// cannot be read.
pub fn scan(root: &Path, backend: &impl DecodeBackend) -> Vec<ImageRecord> {
    match scan_directory(root, backend, &CancelToken::new()) {
        Ok(records) => records,
        Err(e) => {
            error!(root = %root.display(), error = %e, "scan failed");
            Vec::new()
        }
    }
}

/// Scan `root` into records, extracting metadata for each primary file.
///
/// Checks `cancel` between files and returns [`ScanError::Cancelled`] once it
/// is set.
pub fn scan_directory(
    root: &Path,
    backend: &impl DecodeBackend,
    cancel: &CancelToken,
) -> Result<Vec<ImageRecord>, ScanError> {
    info!(root = %root.display(), "scanning directory");
    let files = collect_files(root, cancel)?;
    info!(count = files.len(), "found supported image files");

    let groups = pair_files(&files);

    let mut records: Vec<ImageRecord> = groups
        .into_par_iter()
        .filter_map(|group| {
            if cancel.is_cancelled() {
                return None;
            }
            let meta = metadata::extract(backend, &group.primary);
            ImageRecord::new(group.primary, group.paired, meta)
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}

/// Every supported file under `root`, sorted by path.
pub fn collect_files(root: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "walk error, skipping entry");
                continue;
            }
        };
        if entry.file_type().is_file() && FileKind::of(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Pairing key for a JPEG stem given a set of RAW stems.
///
/// Tries the stem itself, then each prefix ending before an underscore,
/// longest first.
pub fn jpeg_key(stem: &str, raw_stems: &HashSet<String>) -> String {
    if raw_stems.contains(stem) {
        return stem.to_string();
    }
    stem.match_indices('_')
        .rev()
        .map(|(i, _)| &stem[..i])
        .find(|prefix| raw_stems.contains(*prefix))
        .unwrap_or(stem)
        .to_string()
}

fn parent(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

/// Key against the RAWs of the JPEG's own directory first, then the tree.
fn key_for_jpeg(
    path: &Path,
    local: Option<&HashSet<String>>,
    all: &HashSet<String>,
) -> String {
    let s = stem(path);
    if let Some(raws) = local {
        let key = jpeg_key(&s, raws);
        if raws.contains(&key) {
            return key;
        }
    }
    jpeg_key(&s, all)
}

/// Group sorted files into subjects across the whole tree.
pub fn pair_files(files: &[PathBuf]) -> Vec<Group> {
    let mut local_raws: BTreeMap<&Path, HashSet<String>> = BTreeMap::new();
    let mut all_raws: HashSet<String> = HashSet::new();
    for f in files.iter().filter(|f| FileKind::of(f) == Some(FileKind::Raw)) {
        local_raws.entry(parent(f)).or_default().insert(stem(f));
        all_raws.insert(stem(f));
    }

    let mut keyed: BTreeMap<String, Vec<&PathBuf>> = BTreeMap::new();
    for f in files {
        let key = match FileKind::of(f) {
            Some(FileKind::Raw) => stem(f),
            _ => key_for_jpeg(f, local_raws.get(parent(f)), &all_raws),
        };
        keyed.entry(key).or_default().push(f);
    }

    let mut groups = Vec::new();
    for (key, members) in keyed {
        groups.extend(resolve_key(&key, &members));
    }
    groups
}

#[derive(Default)]
struct DirMembers<'a> {
    raws: Vec<&'a PathBuf>,
    jpegs: Vec<&'a PathBuf>,
}

/// Subjects for one key. RAW and JPEG in the same directory pair first;
/// the leftovers pair across directories in path order.
fn resolve_key(key: &str, members: &[&PathBuf]) -> Vec<Group> {
    let mut by_dir: BTreeMap<&Path, DirMembers> = BTreeMap::new();
    for f in members {
        let entry = by_dir.entry(parent(f)).or_default();
        match FileKind::of(f) {
            Some(FileKind::Raw) => entry.raws.push(*f),
            Some(FileKind::Jpeg) => entry.jpegs.push(*f),
            None => {}
        }
    }

    let mut groups = Vec::new();
    let mut lone_raws = Vec::new();
    let mut lone_jpegs = Vec::new();
    for (dir, m) in by_dir {
        if m.raws.len() > 1 || m.jpegs.len() > 1 {
            warn!(
                dir = %dir.display(),
                key,
                raws = m.raws.len(),
                jpegs = m.jpegs.len(),
                "pairing collision, keeping the last file of each kind"
            );
        }
        match (m.raws.last(), m.jpegs.last()) {
            (Some(raw), Some(jpeg)) => groups.push(Group {
                primary: (*raw).clone(),
                paired: Some((*jpeg).clone()),
            }),
            (Some(raw), None) => lone_raws.push(*raw),
            (None, Some(jpeg)) => lone_jpegs.push(*jpeg),
            (None, None) => {}
        }
    }

    let ambiguous = lone_raws.len() > 1 || lone_jpegs.len() > 1;
    if ambiguous && !lone_raws.is_empty() && !lone_jpegs.is_empty() {
        warn!(
            key,
            raws = lone_raws.len(),
            jpegs = lone_jpegs.len(),
            "ambiguous pairing across directories, matching in path order"
        );
    }

    let mut jpegs = lone_jpegs.into_iter();
    for raw in lone_raws {
        groups.push(Group {
            primary: raw.clone(),
            paired: jpegs.next().cloned(),
        });
    }
    groups.extend(jpegs.map(|jpeg| Group {
        primary: jpeg.clone(),
        paired: None,
    }));

    for group in &groups {
        debug!(primary = %group.primary.display(), paired = ?group.paired, "grouped");
    }
    groups
}
