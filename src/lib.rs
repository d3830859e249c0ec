//! # ImCull
//!
//! The core of a culling assistant for photographers. Point it at a shoot
//! directory and it turns a pile of RAW and JPEG files into an ordered
//! catalog the operator can step through, rate, reject, back up, and hand
//! off to a RAW editor.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      shoot/   →  records        (walk, filter, pair RAW+JPEG, read metadata)
//! 2. Catalog   records  →  cursor         (navigate, rate, reject, select)
//! 3. Analyze   catalog  →  blur verdicts  (bounded preview + Laplacian variance)
//! 4. Dispatch  selected →  backups        (copy to destinations) / editor hand-off
//! ```
//!
//! Every stage is best-effort per file. One corrupt RAW gets a fail-safe
//! result and a log line; it never aborts the scan, the analysis, or a
//! backup run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | Supported RAW and JPEG extension sets |
//! | [`record`] | [`ImageRecord`](record::ImageRecord): one logical subject, rating, reject flag, analysis |
//! | [`metadata`] | Staged, best-effort EXIF/RAW/filesystem metadata |
//! | [`imaging`] | Decode backend, RAW develop, embedded previews, resize, blur score |
//! | [`scan`] | Directory walk and RAW+JPEG pairing |
//! | [`catalog`] | Ordered records with a wrapping cursor and selection queries |
//! | [`analysis`] | Parallel analysis of the unanalyzed subset with progress events |
//! | [`cancel`] | Cancellation token shared by scan and analysis |
//! | [`backup`] | Copy selections to several destinations |
//! | [`editor`] | External editor probe and launch |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## RAW Is Primary
//!
//! A RAW and the JPEG the camera wrote next to it are the same photograph.
//! They become one record with the RAW as the primary file and the JPEG as
//! its pair, and every downstream action (backup, editor) carries both.
//!
//! ## Embedded Preview First
//!
//! RAW files already contain a camera-rendered JPEG preview. Analysis uses it
//! when it is large enough and only develops the sensor data when it is not,
//! which keeps focus scoring of a whole card fast.
//!
//! ## Pure-Rust Imaging
//!
//! JPEG decoding uses the `image` crate, RAW sensor data comes from
//! `rawloader`, EXIF from `kamadak-exif`. No system libraries, no external
//! processes except the optional editor.
//!
//! ## Logging, Not Printing
//!
//! The library logs through `tracing` and never installs a subscriber. The
//! embedding application (the `imcull` binary here) decides where logs go.

pub mod analysis;
pub mod backup;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod editor;
pub mod formats;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod record;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
