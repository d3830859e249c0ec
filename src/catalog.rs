//! In-memory image catalog with a cursor.
//!
//! The catalog owns the records of one scan session and is the only place
//! their rating, reject flag and analysis results change. Everything the
//! operator does (step through images, rate, reject) goes through the cursor;
//! the selection queries feed backup and the editor.
//!
//! Cursor rules:
//! - `0 <= index < len`; an empty catalog has no current record.
//! - [`advance`](Catalog::advance) and [`retreat`](Catalog::retreat) wrap.
//! - [`replace`](Catalog::replace) (a new scan) resets the cursor to 0.

use crate::analysis::Analyzer;
use crate::imaging::DecodeBackend;
use crate::record::{Analysis, ImageRecord, InvalidRating, Rating};
use serde::Serialize;

#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<ImageRecord>,
    index: usize,
}

/// Counts for status lines and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub rated: usize,
    pub rejected: usize,
    pub analyzed: usize,
    pub blurry: usize,
}

impl Catalog {
    pub fn new(records: Vec<ImageRecord>) -> Self {
        Self { records, index: 0 }
    }

    /// Swap in a new scan's records and reset the cursor.
    pub fn replace(&mut self, records: Vec<ImageRecord>) {
        self.records = records;
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    /// Cursor position. Meaningless when the catalog is empty.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&ImageRecord> {
        self.records.get(self.index)
    }

    /// Move the cursor to `index`.
    ///
    /// # Panics
    ///
    /// If `index` is out of range. Callers derive indices from this catalog,
    /// so a bad one is a programming error.
    pub fn jump_to(&mut self, index: usize) {
        assert!(
            index < self.records.len(),
            "cursor index {index} out of range for {} records",
            self.records.len()
        );
        self.index = index;
    }

    /// Step forward, wrapping from the last record to the first.
    pub fn advance(&mut self) -> Option<&ImageRecord> {
        if self.records.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.records.len();
        self.current()
    }

    /// Step back, wrapping from the first record to the last.
    pub fn retreat(&mut self) -> Option<&ImageRecord> {
        if self.records.is_empty() {
            return None;
        }
        let len = self.records.len();
        self.index = (self.index + len - 1) % len;
        self.current()
    }

    /// Rate the current record. Does nothing on an empty catalog.
    pub fn set_rating(&mut self, value: u8) -> Result<(), InvalidRating> {
        let rating = Rating::new(value)?;
        if let Some(record) = self.records.get_mut(self.index) {
            record.set_rating(rating);
        }
        Ok(())
    }

    pub fn clear_rating(&mut self) {
        if let Some(record) = self.records.get_mut(self.index) {
            record.set_rating(Rating::UNRATED);
        }
    }

    /// Flip the current record's reject flag. Returns the new state, or
    /// `None` on an empty catalog.
    pub fn toggle_rejected(&mut self) -> Option<bool> {
        let record = self.records.get_mut(self.index)?;
        let rejected = !record.is_rejected();
        record.set_rejected(rejected);
        Some(rejected)
    }

    /// Records rated at least `min_rating` and not rejected, in order.
    pub fn selected(&self, min_rating: u8) -> Vec<&ImageRecord> {
        self.records
            .iter()
            .filter(|r| r.rating().value() >= min_rating && !r.is_rejected())
            .collect()
    }

    /// Indices of [`selected`](Self::selected) records.
    pub fn selected_indices(&self, min_rating: u8) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.rating().value() >= min_rating && !r.is_rejected())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn rejected_only(&self) -> Vec<&ImageRecord> {
        self.records.iter().filter(|r| r.is_rejected()).collect()
    }

    /// Indices of records that have never been analyzed.
    pub fn unanalyzed(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_analyzed())
            .map(|(i, _)| i)
            .collect()
    }

    /// Analyze one record in place. Re-running replaces the previous result.
    ///
    /// Meant to be called one record at a time so a caller can do the
    /// displayed image first and the rest when idle.
    pub fn analyze<B: DecodeBackend>(&mut self, index: usize, analyzer: &Analyzer<B>) {
        let Some(record) = self.records.get(index) else {
            return;
        };
        let analysis = analyzer.analyze(record);
        self.store_analysis(index, analysis);
    }

    /// Write an analysis result computed elsewhere (e.g. on a worker).
    /// Bumps the record's revision. Out-of-range indices are ignored.
    pub fn store_analysis(&mut self, index: usize, analysis: Analysis) {
        if let Some(record) = self.records.get_mut(index) {
            record.set_analysis(analysis);
        }
    }

    /// Reject every analyzed record flagged blurry. Returns how many changed.
    pub fn reject_blurry(&mut self) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            if record.is_blurry() == Some(true) && !record.is_rejected() {
                record.set_rejected(true);
                changed += 1;
            }
        }
        changed
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary {
            total: self.records.len(),
            ..Summary::default()
        };
        for r in &self.records {
            s.rated += r.rating().is_rated() as usize;
            s.rejected += r.is_rejected() as usize;
            s.analyzed += r.is_analyzed() as usize;
            s.blurry += (r.is_blurry() == Some(true)) as usize;
        }
        s
    }
}
