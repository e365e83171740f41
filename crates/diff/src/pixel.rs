//! Region-based pixel comparison for rendered pages.
//!
//! Two equal-sized rasters are compared channel-wise against a per-pixel
//! noise threshold, producing a binary diff mask, differing-pixel
//! percentages for the whole image and for two vertical bands (first-view
//! and body), and a PNG visualization of the mask.
//!
//! Rasters of different dimensions are not aligned: dimension drift is
//! itself evidence of change and reported as a maximal (100%) diff.

use image::{Rgba, RgbaImage};

use crate::comparator::RegionMetrics;
use crate::error::DiffError;

/// Channel differences at or below this value are ignored as render noise
/// (~10% of full channel range).
pub const DEFAULT_CHANNEL_THRESHOLD: u8 = 25;

/// Height of the first-view band in logical pixels. Shorter images are
/// treated as all first-view.
pub const FIRST_VIEW_HEIGHT: u32 = 800;

/// Result of a pixel comparison.
#[derive(Debug)]
pub struct PixelDiff {
    pub metrics: RegionMetrics,
    /// PNG visualization of the diff mask. `None` when the dimensions
    /// differed and no mask could be computed.
    pub diff_image: Option<Vec<u8>>,
}

/// Compare two encoded images region-by-region.
pub fn compare_images(prev: &[u8], curr: &[u8], threshold: u8) -> Result<PixelDiff, DiffError> {
    let prev = decode(prev)?;
    let curr = decode(curr)?;

    if prev.dimensions() != curr.dimensions() {
        tracing::debug!(
            prev_w = prev.width(),
            prev_h = prev.height(),
            curr_w = curr.width(),
            curr_h = curr.height(),
            "raster dimensions differ, reporting maximal diff"
        );
        return Ok(PixelDiff {
            metrics: RegionMetrics {
                overall: 100.0,
                first_view: 100.0,
                body: 100.0,
            },
            diff_image: None,
        });
    }

    let (width, height) = curr.dimensions();
    let first_view_rows = height.min(FIRST_VIEW_HEIGHT);

    let mut mask = RgbaImage::new(width, height);
    let mut diff_total: u64 = 0;
    let mut diff_first_view: u64 = 0;

    for y in 0..height {
        for x in 0..width {
            let a = prev.get_pixel(x, y);
            let b = curr.get_pixel(x, y);
            if exceeds_threshold(a, b, threshold) {
                diff_total += 1;
                if y < first_view_rows {
                    diff_first_view += 1;
                }
                mask.put_pixel(x, y, Rgba([220, 30, 30, 255]));
            } else {
                // Faded grey rendition of the current capture for context.
                let grey = luma(b) / 2 + 110;
                mask.put_pixel(x, y, Rgba([grey, grey, grey, 255]));
            }
        }
    }

    let total_pixels = width as u64 * height as u64;
    let first_view_pixels = width as u64 * first_view_rows as u64;
    let body_pixels = total_pixels - first_view_pixels;
    let diff_body = diff_total - diff_first_view;

    let metrics = RegionMetrics {
        overall: percentage(diff_total, total_pixels),
        first_view: percentage(diff_first_view, first_view_pixels),
        body: percentage(diff_body, body_pixels),
    };

    Ok(PixelDiff {
        metrics,
        diff_image: Some(encode_png(mask)?),
    })
}

fn decode(bytes: &[u8]) -> Result<RgbaImage, DiffError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| DiffError::Decode(e.to_string()))
}

fn encode_png(img: RgbaImage) -> Result<Vec<u8>, DiffError> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| DiffError::Encode(e.to_string()))?;
    Ok(buf)
}

/// A pixel differs when any RGB channel moves by more than `threshold`.
/// Alpha is ignored: renderers disagree on transparency of blank regions.
fn exceeds_threshold(a: &Rgba<u8>, b: &Rgba<u8>, threshold: u8) -> bool {
    (0..3).any(|c| a.0[c].abs_diff(b.0[c]) > threshold)
}

fn luma(p: &Rgba<u8>) -> u8 {
    ((p.0[0] as u32 * 299 + p.0[1] as u32 * 587 + p.0[2] as u32 * 114) / 1000 / 2) as u8
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
