//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the largest size that fits `source` inside `bounds` while
/// keeping its aspect ratio.
///
/// The aspect comparison is done by cross-multiplication so the constrained
/// edge lands exactly on the box edge. A wider-than-box image is constrained
/// by width, anything else by height. Never upscales: an image already inside
/// the box comes back unchanged.
///
/// # Examples
/// ```
/// # use imcull::imaging::fit_within;
/// // 4:3 landscape into 1600x1200 → fills the box exactly
/// assert_eq!(fit_within((4000, 3000), (1600, 1200)), (1600, 1200));
///
/// // 3:4 portrait is constrained by height
/// assert_eq!(fit_within((3000, 4000), (1600, 1200)), (900, 1200));
///
/// // Already small enough: unchanged
/// assert_eq!(fit_within((400, 300), (1600, 1200)), (400, 300));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let (w, h) = (src_w as u64, src_h as u64);
    let (bw, bh) = (max_w as u64, max_h as u64);

    let (out_w, out_h) = if w * bh > bw * h {
        // Relatively wider than the box: width binds
        (bw, bw * h / w)
    } else {
        (bh * w / h, bh)
    };

    (out_w.max(1) as u32, out_h.max(1) as u32)
}

/// Whether an embedded preview is too small to judge focus on.
///
/// Either edge below `min_edge` disqualifies it.
pub fn is_undersized(dims: (u32, u32), min_edge: u32) -> bool {
    dims.0 < min_edge || dims.1 < min_edge
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_landscape_matching_aspect() {
        assert_eq!(fit_within((4000, 3000), (1600, 1200)), (1600, 1200));
    }

    #[test]
    fn fit_portrait_constrained_by_height() {
        assert_eq!(fit_within((3000, 4000), (1600, 1200)), (900, 1200));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_within((400, 300), (1600, 1200)), (400, 300));
        assert_eq!(fit_within((1600, 1200), (1600, 1200)), (1600, 1200));
    }

    #[test]
    fn fit_panorama_constrained_by_width() {
        // 3:1 panorama is wider than 4:3 → width binds
        assert_eq!(fit_within((6000, 2000), (1600, 1200)), (1600, 533));
    }

    #[test]
    fn fit_square_into_landscape_box() {
        assert_eq!(fit_within((3000, 3000), (1600, 1200)), (1200, 1200));
    }

    #[test]
    fn fit_only_one_edge_oversized() {
        // Tall strip: height too big, width fine
        assert_eq!(fit_within((1000, 2400), (1600, 1200)), (500, 1200));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((100_000, 10), (1600, 1200)), (1600, 1));
    }

    #[test]
    fn fit_degenerate_source_unchanged() {
        assert_eq!(fit_within((0, 500), (1600, 1200)), (0, 500));
    }

    // =========================================================================
    // is_undersized tests
    // =========================================================================

    #[test]
    fn undersized_if_either_edge_short() {
        assert!(!is_undersized((1620, 1080), 1000));
        assert!(is_undersized((1600, 900), 1000));
        assert!(is_undersized((640, 480), 1000));
        assert!(!is_undersized((1000, 1000), 1000));
    }
}
