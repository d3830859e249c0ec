//! Colour filter array reconstruction.
//!
//! Works on a [`Mosaic`]: one linear, black-subtracted, white-balanced sample
//! per photosite in `0.0..=1.0`, plus the sensor's [`CfaPattern`]. Produces
//! interleaved linear RGB at the same size. Rendering to 8-bit sRGB is a
//! separate step ([`render_srgb`]) so cropping happens after interpolation,
//! where the border photosites still have neighbours.
//!
//! Two algorithms:
//!
//! - [`Demosaic::Bilinear`]: average of the same-colour photosites in the
//!   3×3 neighbourhood (5×5 when the 3×3 has none). Works on any pattern,
//!   including X-Trans.
//! - [`Demosaic::HighQuality`]: Malvar-He-Cutler gradient-corrected linear
//!   interpolation for 2×2 Bayer patterns. Other layouts use bilinear.

use super::backend::Demosaic;
use super::blur::reflect101;
use image::RgbImage;
use rayon::prelude::*;
use std::sync::LazyLock;

pub const RED: u8 = 0;
pub const GREEN: u8 = 1;
pub const BLUE: u8 = 2;

/// Repeating colour filter layout. Colours are `RED`, `GREEN` or `BLUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfaPattern {
    width: usize,
    height: usize,
    colors: Vec<u8>,
}

impl CfaPattern {
    /// Build from a row-major tile. Returns `None` for an empty or ragged
    /// tile, or for colours outside RGB.
    pub fn new(width: usize, height: usize, colors: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || colors.len() != width * height {
            return None;
        }
        if colors.iter().any(|&c| c > BLUE) {
            return None;
        }
        Some(Self {
            width,
            height,
            colors,
        })
    }

    pub fn rggb() -> Self {
        Self {
            width: 2,
            height: 2,
            colors: vec![RED, GREEN, GREEN, BLUE],
        }
    }

    pub fn color_at(&self, row: usize, col: usize) -> u8 {
        self.colors[(row % self.height) * self.width + col % self.width]
    }

    /// A 2×2 tile with one red, one blue and diagonal greens.
    pub fn is_bayer(&self) -> bool {
        if self.width != 2 || self.height != 2 {
            return false;
        }
        let c = &self.colors;
        let others = if c[1] == GREEN && c[2] == GREEN {
            (c[0], c[3])
        } else if c[0] == GREEN && c[3] == GREEN {
            (c[1], c[2])
        } else {
            return false;
        };
        matches!(others, (RED, BLUE) | (BLUE, RED))
    }

    /// Letter description such as `RGGB`.
    pub fn describe(&self) -> String {
        self.colors
            .iter()
            .map(|&c| match c {
                RED => 'R',
                GREEN => 'G',
                _ => 'B',
            })
            .collect()
    }
}

/// Single-channel sensor data ready for interpolation.
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
    pub cfa: CfaPattern,
}

impl Mosaic {
    fn at(&self, x: isize, y: isize) -> f32 {
        let x = reflect101(x, self.width);
        let y = reflect101(y, self.height);
        self.values[y * self.width + x]
    }

    fn color(&self, x: isize, y: isize) -> u8 {
        self.cfa
            .color_at(reflect101(y, self.height), reflect101(x, self.width))
    }
}

/// Interpolate the missing colours. Returns interleaved linear RGB.
pub fn demosaic(mosaic: &Mosaic, quality: Demosaic) -> Vec<f32> {
    let mut rgb = vec![0f32; mosaic.width * mosaic.height * 3];
    if mosaic.width == 0 || mosaic.height == 0 {
        return rgb;
    }
    let use_malvar = quality == Demosaic::HighQuality
        && mosaic.cfa.is_bayer()
        && mosaic.width >= 3
        && mosaic.height >= 3;

    rgb.par_chunks_mut(mosaic.width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..mosaic.width {
                let px = if use_malvar {
                    malvar_pixel(mosaic, x as isize, y as isize)
                } else {
                    bilinear_pixel(mosaic, x as isize, y as isize)
                };
                row[x * 3..x * 3 + 3].copy_from_slice(&px);
            }
        });
    rgb
}

fn bilinear_pixel(m: &Mosaic, x: isize, y: isize) -> [f32; 3] {
    let own = m.color(x, y);
    let mut out = [0f32; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let c = c as u8;
        if c == own {
            *slot = m.at(x, y);
            continue;
        }
        *slot = neighbour_mean(m, x, y, c, 1)
            .or_else(|| neighbour_mean(m, x, y, c, 2))
            .unwrap_or(0.0);
    }
    out
}

fn neighbour_mean(m: &Mosaic, x: isize, y: isize, color: u8, radius: isize) -> Option<f32> {
    let mut sum = 0.0;
    let mut n = 0u32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if m.color(x + dx, y + dy) == color {
                sum += m.at(x + dx, y + dy);
                n += 1;
            }
        }
    }
    (n > 0).then(|| sum / n as f32)
}

fn malvar_pixel(m: &Mosaic, x: isize, y: isize) -> [f32; 3] {
    let v = |dx: isize, dy: isize| m.at(x + dx, y + dy);
    let c = v(0, 0);
    let cross = v(-1, 0) + v(1, 0) + v(0, -1) + v(0, 1);
    let diag = v(-1, -1) + v(1, -1) + v(-1, 1) + v(1, 1);
    let far_h = v(-2, 0) + v(2, 0);
    let far_v = v(0, -2) + v(0, 2);

    match m.color(x, y) {
        GREEN => {
            // Kernel for the colour sharing this row, and its transpose
            let along_row = (5.0 * c + 4.0 * (v(-1, 0) + v(1, 0)) - diag - far_h + 0.5 * far_v) / 8.0;
            let along_col = (5.0 * c + 4.0 * (v(0, -1) + v(0, 1)) - diag - far_v + 0.5 * far_h) / 8.0;
            if m.color(x + 1, y) == RED {
                [along_row, c, along_col]
            } else {
                [along_col, c, along_row]
            }
        }
        own => {
            let green = (4.0 * c + 2.0 * cross - far_h - far_v) / 8.0;
            let opposite = (6.0 * c + 2.0 * diag - 1.5 * (far_h + far_v)) / 8.0;
            if own == RED {
                [c, green, opposite]
            } else {
                [opposite, green, c]
            }
        }
    }
}

/// Crop rectangle in sensor coordinates: `(x, y, width, height)`.
pub type Crop = (usize, usize, usize, usize);

static SRGB_LUT: LazyLock<Vec<u8>> = LazyLock::new(|| {
    (0..LUT_SIZE)
        .map(|i| {
            let v = i as f32 / (LUT_SIZE - 1) as f32;
            let s = if v <= 0.003_130_8 {
                12.92 * v
            } else {
                1.055 * v.powf(1.0 / 2.4) - 0.055
            };
            (s * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect()
});

const LUT_SIZE: usize = 4096;

fn encode_srgb(v: f32) -> u8 {
    let idx = (v.clamp(0.0, 1.0) * (LUT_SIZE - 1) as f32).round() as usize;
    SRGB_LUT[idx]
}

/// Crop interleaved linear RGB and encode it as 8-bit sRGB.
pub fn render_srgb(rgb: &[f32], width: usize, crop: Crop) -> RgbImage {
    let (cx, cy, cw, ch) = crop;
    let mut out = Vec::with_capacity(cw * ch * 3);
    for y in cy..cy + ch {
        let row = &rgb[(y * width + cx) * 3..(y * width + cx + cw) * 3];
        out.extend(row.iter().map(|&v| encode_srgb(v)));
    }
    RgbImage::from_raw(cw as u32, ch as u32, out).unwrap_or_else(|| RgbImage::new(0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mosaic_from_fn(w: usize, h: usize, cfa: CfaPattern, f: impl Fn(usize, usize, u8) -> f32) -> Mosaic {
        let mut values = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                values.push(f(x, y, cfa.color_at(y, x)));
            }
        }
        Mosaic {
            width: w,
            height: h,
            values,
            cfa,
        }
    }

    /// Sensor looking at a flat colour: each photosite sees its channel.
    fn flat_mosaic(w: usize, h: usize, cfa: CfaPattern, rgb: [f32; 3]) -> Mosaic {
        mosaic_from_fn(w, h, cfa, |_, _, c| rgb[c as usize])
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn bayer_detection() {
        assert!(CfaPattern::rggb().is_bayer());
        assert!(CfaPattern::new(2, 2, vec![GREEN, RED, BLUE, GREEN]).unwrap().is_bayer());
        assert!(CfaPattern::new(2, 2, vec![BLUE, GREEN, GREEN, RED]).unwrap().is_bayer());
        assert!(!CfaPattern::new(2, 2, vec![RED, GREEN, GREEN, RED]).unwrap().is_bayer());
        assert!(!CfaPattern::new(2, 1, vec![RED, GREEN]).unwrap().is_bayer());
    }

    #[test]
    fn pattern_rejects_bad_tiles() {
        assert!(CfaPattern::new(2, 2, vec![RED, GREEN]).is_none());
        assert!(CfaPattern::new(0, 0, vec![]).is_none());
        assert!(CfaPattern::new(1, 1, vec![7]).is_none());
    }

    #[test]
    fn describe_pattern() {
        assert_eq!(CfaPattern::rggb().describe(), "RGGB");
    }

    #[test]
    fn flat_colour_reconstructs_exactly_with_both_algorithms() {
        let rgb = [0.6, 0.3, 0.1];
        for quality in [Demosaic::Bilinear, Demosaic::HighQuality] {
            let m = flat_mosaic(8, 6, CfaPattern::rggb(), rgb);
            let out = demosaic(&m, quality);
            for px in out.chunks_exact(3) {
                for c in 0..3 {
                    assert_close(px[c], rgb[c]);
                }
            }
        }
    }

    #[test]
    fn non_bayer_layout_falls_back_to_neighbour_mean() {
        // 3x1 stripes: no 2x2 Bayer structure
        let cfa = CfaPattern::new(3, 1, vec![RED, GREEN, BLUE]).unwrap();
        let m = flat_mosaic(9, 4, cfa, [0.2, 0.4, 0.8]);
        let out = demosaic(&m, Demosaic::HighQuality);
        assert_close(out[0], 0.2);
        assert_close(out[1], 0.4);
        assert_close(out[2], 0.8);
    }

    #[test]
    fn high_quality_follows_linear_gradient() {
        // Linear ramps are reproduced exactly by the gradient-corrected kernels
        let m = mosaic_from_fn(12, 12, CfaPattern::rggb(), |x, _, _| x as f32 / 16.0);
        let out = demosaic(&m, Demosaic::HighQuality);
        let (x, y) = (5, 5);
        let px = &out[(y * 12 + x) * 3..(y * 12 + x) * 3 + 3];
        for c in 0..3 {
            assert_close(px[c], x as f32 / 16.0);
        }
    }

    #[test]
    fn render_crops_and_encodes() {
        let m = flat_mosaic(6, 4, CfaPattern::rggb(), [1.0, 0.0, 0.21404114]);
        let rgb = demosaic(&m, Demosaic::Bilinear);
        let img = render_srgb(&rgb, 6, (1, 1, 4, 2));
        assert_eq!(img.dimensions(), (4, 2));
        let p = img.get_pixel(0, 0);
        assert_eq!(p[0], 255);
        assert_eq!(p[1], 0);
        // linear 0.214 is mid-grey in sRGB
        assert!((p[2] as i32 - 128).abs() <= 1, "{}", p[2]);
    }
}
