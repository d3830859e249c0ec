//! Decoding, previews and focus scoring: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode JPEG** | `image::ImageReader` |
//! | **Develop RAW** | `rawloader` + in-crate demosaic |
//! | **Embedded preview** | JPEG marker walk over the container bytes |
//! | **Preview resize** | area averaging, aspect preserved, never upscales |
//! | **Blur score** | variance of the Laplacian |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Backend**: [`DecodeBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend
//! - **Blur**: [`BlurDetector`], independent of any backend

pub mod backend;
pub mod blur;
mod calculations;
pub mod demosaic;
pub mod operations;
pub(crate) mod preview;
mod resize;
pub mod rust_backend;

pub use backend::{
    DecodeBackend, DecodeError, Demosaic, Dimensions, EmbeddedPreview, RawInfo, RawType,
};
pub use blur::{BlurDetector, BlurVerdict, DEFAULT_BLUR_THRESHOLD};
pub use calculations::{fit_within, is_undersized};
pub use operations::{ThumbnailConfig, load_image, load_thumbnail, shrink_to_fit};
pub use resize::resize_area;
pub use rust_backend::RustBackend;
