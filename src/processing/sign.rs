//! Charge/credit detection from the narrow marker column.
//!
//! The engine routinely drops or misreads the tiny +/- glyph, so the sign
//! is taken from pixel shape instead: a '-' inks a narrow horizontal band,
//! a '+' has a vertical stroke spanning most of the cell. Analysis is
//! restricted to the inner region of the cell to keep rule lines out.

use image::GrayImage;

use crate::models::Sign;

pub struct SignDetector {
    /// Pixels darker than this count as marker ink.
    pub dark_threshold: u8,
    /// Fraction of the cell cropped away on each side before analysis.
    pub inner_margin: f32,
    /// Vertical coverage below which the marker is read as '-'.
    pub band_ratio: f32,
    /// Fewer dark pixels than this and the cell has no usable signal.
    pub min_marker_pixels: u32,
}

impl Default for SignDetector {
    fn default() -> Self {
        // Calibrated against sample statements; see DESIGN.md.
        SignDetector {
            dark_threshold: 100,
            inner_margin: 0.20,
            band_ratio: 0.40,
            min_marker_pixels: 2,
        }
    }
}

impl SignDetector {
    /// Classify the marker in an amount-sign cell. `Unknown` means the
    /// signal was too weak or the cell too small to call; the final sign is
    /// then the category default.
    pub fn detect(&self, cell: &GrayImage) -> Sign {
        let (w, h) = cell.dimensions();
        if w < 6 || h < 6 {
            return Sign::Unknown;
        }

        let margin_x = (w as f32 * self.inner_margin) as u32;
        let margin_y = (h as f32 * self.inner_margin) as u32;
        let (ix0, iy0) = (margin_x, margin_y);
        let (ix1, iy1) = (w - margin_x, h - margin_y);
        if ix1 <= ix0 + 2 || iy1 <= iy0 + 2 {
            return Sign::Unknown;
        }

        let inner_height = iy1 - iy0;
        let mut dark_total = 0u32;
        let mut rows_with_ink = 0u32;
        for y in iy0..iy1 {
            let row_dark = (ix0..ix1)
                .filter(|&x| cell.get_pixel(x, y)[0] < self.dark_threshold)
                .count() as u32;
            dark_total += row_dark;
            if row_dark > 0 {
                rows_with_ink += 1;
            }
        }

        if dark_total < self.min_marker_pixels {
            return Sign::Unknown;
        }

        let vertical_coverage = rows_with_ink as f32 / inner_height as f32;
        if vertical_coverage < self.band_ratio {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}
