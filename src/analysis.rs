//! Focus analysis over a catalog.
//!
//! Analysis of one record is: load a bounded preview, score it with the
//! Laplacian-variance detector, store preview, score and verdict on the record.
//! Records are independent, so the unanalyzed subset runs in parallel on the
//! rayon pool (sized once at startup from `[processing] max_workers`).
//!
//! ## Ordering and visibility
//!
//! Workers never touch the catalog. Each sends `(index, Analysis)` back over a
//! channel and the calling thread writes it, bumping that record's revision.
//! A reader on the calling thread therefore sees a record either before or
//! after its analysis, never halfway, and can spot fresh results by revision.
//!
//! The record under the cursor is analyzed first, synchronously, so the image
//! the operator is looking at gets its verdict before the batch starts.
//!
//! ## Cancellation
//!
//! The [`CancelToken`] is checked before each record. Records not yet started
//! stay unanalyzed; results already computed are still written.

use crate::cancel::CancelToken;
use crate::catalog::Catalog;
use crate::imaging::{BlurDetector, DecodeBackend, ThumbnailConfig, load_thumbnail};
use crate::record::{Analysis, ImageRecord};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use tracing::{debug, info};

/// Progress events emitted by [`analyze_pending`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Started {
        total: usize,
    },
    Analyzed {
        index: usize,
        filename: String,
        score: f64,
        is_blurry: bool,
        /// False when no preview could be decoded (fail-safe verdict).
        has_thumbnail: bool,
    },
    Cancelled {
        remaining: usize,
    },
    Finished {
        analyzed: usize,
    },
}

/// Everything needed to analyze a record, shareable across workers.
pub struct Analyzer<B> {
    backend: B,
    detector: BlurDetector,
    thumbnails: ThumbnailConfig,
}

impl<B: DecodeBackend> Analyzer<B> {
    pub fn new(backend: B, detector: BlurDetector, thumbnails: ThumbnailConfig) -> Self {
        Self {
            backend,
            detector,
            thumbnails,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn detector(&self) -> &BlurDetector {
        &self.detector
    }

    /// Preview + score for one file. A preview that cannot be decoded gives
    /// the fail-safe verdict (blurry, score 0) and no thumbnail.
    pub fn analyze_file(&self, path: &Path) -> Analysis {
        let thumbnail = load_thumbnail(&self.backend, path, &self.thumbnails);
        let verdict = self.detector.detect(thumbnail.as_ref());
        debug!(
            path = %path.display(),
            score = verdict.score,
            blurry = verdict.is_blurry,
            "analyzed"
        );
        Analysis {
            blur_score: verdict.score,
            is_blurry: verdict.is_blurry,
            thumbnail: thumbnail.map(Arc::new),
        }
    }

    pub fn analyze(&self, record: &ImageRecord) -> Analysis {
        self.analyze_file(&record.path)
    }
}

fn send(events: &Option<Sender<AnalysisEvent>>, event: AnalysisEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

fn analyzed_event(catalog: &Catalog, index: usize) -> Option<AnalysisEvent> {
    let record = catalog.get(index)?;
    let analysis = record.analysis()?;
    Some(AnalysisEvent::Analyzed {
        index,
        filename: record.filename.clone(),
        score: analysis.blur_score,
        is_blurry: analysis.is_blurry,
        has_thumbnail: analysis.thumbnail.is_some(),
    })
}

/// Analyze every record that has no result yet. Returns how many were
/// analyzed.
pub fn analyze_pending<B: DecodeBackend>(
    catalog: &mut Catalog,
    analyzer: &Analyzer<B>,
    cancel: &CancelToken,
    events: Option<Sender<AnalysisEvent>>,
) -> usize {
    let mut pending = catalog.unanalyzed();
    if pending.is_empty() {
        send(&events, AnalysisEvent::Finished { analyzed: 0 });
        return 0;
    }
    let total = pending.len();
    info!(total, "analyzing images");
    send(&events, AnalysisEvent::Started { total });

    let mut analyzed = 0;

    // Whatever is on screen goes first
    let current = catalog.index();
    if let Some(pos) = pending.iter().position(|&i| i == current) {
        if cancel.is_cancelled() {
            send(&events, AnalysisEvent::Cancelled { remaining: total });
            return 0;
        }
        pending.remove(pos);
        catalog.analyze(current, analyzer);
        analyzed += 1;
        if let Some(event) = analyzed_event(catalog, current) {
            send(&events, event);
        }
    }

    let jobs: Vec<(usize, PathBuf)> = pending
        .iter()
        .filter_map(|&i| catalog.get(i).map(|r| (i, r.path.clone())))
        .collect();

    let (tx, rx) = mpsc::channel::<(usize, Analysis)>();
    std::thread::scope(|s| {
        s.spawn(move || {
            jobs.into_par_iter().for_each_with(tx, |tx, (index, path)| {
                if cancel.is_cancelled() {
                    return;
                }
                tx.send((index, analyzer.analyze_file(&path))).ok();
            });
        });

        for (index, analysis) in rx {
            catalog.store_analysis(index, analysis);
            analyzed += 1;
            if let Some(event) = analyzed_event(catalog, index) {
                send(&events, event);
            }
        }
    });

    if cancel.is_cancelled() {
        let remaining = total - analyzed;
        info!(analyzed, remaining, "analysis cancelled");
        send(&events, AnalysisEvent::Cancelled { remaining });
    } else {
        info!(analyzed, "analysis finished");
        send(&events, AnalysisEvent::Finished { analyzed });
    }
    analyzed
}
