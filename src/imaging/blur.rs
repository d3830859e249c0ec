//! Laplacian-variance focus measure.
//!
//! The image is reduced to luminance, convolved with the 4-neighbour discrete
//! Laplacian
//!
//! ```text
//! [ 0  1  0 ]
//! [ 1 -4  1 ]
//! [ 0  1  0 ]
//! ```
//!
//! and the population variance of the response is the score. Sharp images
//! have many strong second-derivative responses, so a low variance means few
//! edges and probably missed focus.
//!
//! Borders are handled by mirroring without repeating the edge pixel
//! (`dcb|abcd|cba`), so every pixel contributes a response and tiny images
//! still produce a score.
//!
//! The score is relative: it moves with the preview resolution and has no
//! meaning across different threshold configurations.

use image::RgbImage;

/// Default blur threshold. Lower values flag fewer images.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// Outcome of a blur check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurVerdict {
    pub is_blurry: bool,
    pub score: f64,
}

/// Classifies images against a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurDetector {
    pub threshold: f64,
}

impl Default for BlurDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BLUR_THRESHOLD,
        }
    }
}

impl BlurDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Score `image` and classify it. A missing image is maximally blurry
    /// (`is_blurry = true`, `score = 0.0`).
    pub fn detect(&self, image: Option<&RgbImage>) -> BlurVerdict {
        let Some(image) = image else {
            return BlurVerdict {
                is_blurry: true,
                score: 0.0,
            };
        };
        let score = laplacian_variance(image);
        BlurVerdict {
            is_blurry: score < self.threshold,
            score,
        }
    }
}

/// Variance of the Laplacian of `image`'s luminance.
pub fn laplacian_variance(image: &RgbImage) -> f64 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let (w, h) = (width as usize, height as usize);

    // BT.601 luma, kept in floating point
    let luma: Vec<f64> = image
        .pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .collect();
    let at = |x: isize, y: isize| luma[reflect101(y, h) * w + reflect101(x, w)];

    let n = (w * h) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h as isize {
        for x in 0..w as isize {
            let response =
                at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample.
pub(crate) fn reflect101(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = i.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}
