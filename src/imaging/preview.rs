//! Embedded JPEG preview extraction from RAW containers.
//!
//! Cameras store one or more full JPEGs inside their RAW files (a small EXIF
//! thumbnail, a screen-size preview and often a full-size one). Rather than
//! parse every vendor's IFD layout, this walks the container bytes looking
//! for JPEG start-of-image markers and validates each candidate by walking
//! its marker segments properly:
//!
//! - segment lengths are honoured, so marker-like bytes inside EXIF payloads
//!   are skipped;
//! - entropy-coded data after SOS is scanned for the next real marker (`FF`
//!   not followed by `00` or a restart marker);
//! - only baseline/extended/progressive Huffman frames (`SOF0..SOF2`) count,
//!   which excludes the lossless-JPEG sensor data in CR2 and DNG files.
//!
//! The candidate with the largest frame area wins. Scanning resumes after
//! each accepted JPEG, so the EXIF thumbnail nested inside a preview's APP1
//! segment is not reported separately.

/// Location and frame size of a JPEG found inside a larger buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegSpan {
    pub start: usize,
    /// Exclusive end (just past the EOI marker).
    pub end: usize,
    pub width: u32,
    pub height: u32,
}

impl JpegSpan {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;

/// Find the largest well-formed JPEG inside `data`.
pub fn largest_jpeg(data: &[u8]) -> Option<JpegSpan> {
    let mut best: Option<JpegSpan> = None;
    let mut pos = 0;

    while let Some(offset) = find_soi(&data[pos..]) {
        let start = pos + offset;
        match walk_jpeg(data, start) {
            Some(span) => {
                if best.is_none_or(|b| span.area() > b.area()) {
                    best = Some(span);
                }
                pos = span.end;
            }
            None => pos = start + 2,
        }
    }

    best
}

fn find_soi(data: &[u8]) -> Option<usize> {
    data.windows(3)
        .position(|w| w[0] == 0xFF && w[1] == SOI && w[2] == 0xFF)
}

/// Walk the marker segments of a JPEG beginning at `start`.
fn walk_jpeg(data: &[u8], start: usize) -> Option<JpegSpan> {
    let mut pos = start + 2;
    let mut frame: Option<(u32, u32)> = None;

    loop {
        // Fill bytes before a marker are legal
        while data.get(pos) == Some(&0xFF) && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if data.get(pos) != Some(&0xFF) {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        pos += 2;

        match marker {
            EOI => {
                let (width, height) = frame?;
                return Some(JpegSpan {
                    start,
                    end: pos,
                    width,
                    height,
                });
            }
            SOI => return None,
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => continue,
            _ => {}
        }

        let len = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
        if len < 2 {
            return None;
        }
        let segment = data.get(pos + 2..pos + len)?;

        match marker {
            0xC0..=0xC2 => {
                if segment.len() < 5 {
                    return None;
                }
                let height = u16::from_be_bytes([segment[1], segment[2]]) as u32;
                let width = u16::from_be_bytes([segment[3], segment[4]]) as u32;
                if width == 0 || height == 0 {
                    return None;
                }
                frame = Some((width, height));
            }
            // Lossless, arithmetic and hierarchical frames are not previews
            0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => return None,
            _ => {}
        }

        pos += len;

        if marker == SOS {
            pos = skip_entropy_coded(data, pos)?;
        }
    }
}

/// Advance past entropy-coded data to the next real marker.
fn skip_entropy_coded(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let ff = data.get(pos..)?.iter().position(|&b| b == 0xFF)?;
        pos += ff;
        match data.get(pos + 1)? {
            0x00 | 0xD0..=0xD7 | 0xFF => pos += 1,
            _ => return Some(pos),
        }
    }
}
