//! Cell cropping and image conditioning ahead of recognition.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::filter::sharpen3x3;

/// Outward padding when cropping a cell for OCR. Catches glyphs that touch
/// the rule lines, at the cost of occasional border bleed the normalizer
/// strips back out.
pub const CELL_PAD: u32 = 5;

/// Minimum crop height below which the image gets upscaled before OCR.
pub const MIN_OCR_HEIGHT: u32 = 50;

/// Crop a cell from the page with `pad` pixels of outward padding, clamped
/// to the page. Returns `None` for degenerate spans.
pub fn crop_cell(page: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, pad: u32) -> Option<GrayImage> {
    let cx0 = x0.saturating_sub(pad);
    let cy0 = y0.saturating_sub(pad);
    let cx1 = (x1 + pad).min(page.width());
    let cy1 = (y1 + pad).min(page.height());
    if cx1 <= cx0 || cy1 <= cy0 {
        return None;
    }
    Some(imageops::crop_imm(page, cx0, cy0, cx1 - cx0, cy1 - cy0).to_image())
}

/// Upscale small crops and sharpen, matching what the recognition engine
/// handles best at 300 DPI.
pub fn prepare_for_ocr(img: &GrayImage, min_height: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    let scaled = if h < min_height && h > 0 {
        let factor = (min_height + h - 1) / h;
        let factor = factor.max(2);
        imageops::resize(img, w * factor, h * factor, FilterType::Lanczos3)
    } else {
        img.clone()
    };
    sharpen3x3(&scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_is_clamped_to_page() {
        let page = GrayImage::from_pixel(100, 80, image::Luma([255u8]));
        let cell = crop_cell(&page, 90, 70, 100, 80, CELL_PAD).unwrap();
        assert_eq!(cell.dimensions(), (15, 15));
    }

    #[test]
    fn degenerate_span_yields_none() {
        let page = GrayImage::from_pixel(100, 80, image::Luma([255u8]));
        assert!(crop_cell(&page, 50, 40, 50, 60, 0).is_none());
    }

    #[test]
    fn small_crop_is_upscaled() {
        let img = GrayImage::from_pixel(40, 20, image::Luma([128u8]));
        let prepared = prepare_for_ocr(&img, MIN_OCR_HEIGHT);
        assert!(prepared.height() >= MIN_OCR_HEIGHT);
        assert_eq!(prepared.height() % 20, 0);
    }

    #[test]
    fn tall_crop_keeps_its_size() {
        let img = GrayImage::from_pixel(40, 60, image::Luma([128u8]));
        let prepared = prepare_for_ocr(&img, MIN_OCR_HEIGHT);
        assert_eq!(prepared.dimensions(), (40, 60));
    }
}
