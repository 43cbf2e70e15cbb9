//! Character recognition seam and the per-cell reading strategy.
//!
//! The engine is a black box behind `TextRecognizer`: it never fails, it
//! just returns empty or garbage text for unreadable input. `CellReader`
//! runs two fixed recognition attempts with different page-segmentation
//! assumptions and picks the one that best fits the column role, so a given
//! cell image always reads the same way.

use image::GrayImage;
use log::warn;
use tesseract::Tesseract;

use crate::models::ColumnRole;
use crate::processing::normalize;
use crate::processing::preprocess::{prepare_for_ocr, MIN_OCR_HEIGHT};

/// The two fixed page-segmentation assumptions a cell is attempted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationMode {
    /// Treat the crop as a single text line (PSM 7).
    SingleLine,
    /// Treat the crop as a uniform block of text (PSM 6).
    UniformBlock,
}

impl SegmentationMode {
    fn psm(&self) -> &'static str {
        match self {
            SegmentationMode::SingleLine => "7",
            SegmentationMode::UniformBlock => "6",
        }
    }
}

/// Recognition engines never error toward the pipeline: unreadable input
/// yields an empty string and the normalizer deals with the rest.
pub trait TextRecognizer: Sync {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> String;
}

/// Tesseract-backed recognizer. The engine reads from a file, so each call
/// round-trips the crop through a temporary PNG, as cheap as it is boring.
pub struct TesseractRecognizer {
    lang: String,
}

impl TesseractRecognizer {
    /// Spanish traineddata; the statement layout this crate targets is a
    /// Spanish-language format.
    pub fn new() -> Self {
        Self::with_lang("spa")
    }

    pub fn with_lang(lang: &str) -> Self {
        TesseractRecognizer { lang: lang.to_string() }
    }

    fn recognize_inner(&self, image: &GrayImage, mode: SegmentationMode) -> Result<String, String> {
        let temp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| format!("temp file: {}", e))?;
        image
            .save(temp.path())
            .map_err(|e| format!("write crop: {}", e))?;
        let path = temp
            .path()
            .to_str()
            .ok_or_else(|| "non-utf8 temp path".to_string())?;

        let text = Tesseract::new(None, Some(&self.lang))
            .map_err(|e| format!("tesseract init: {}", e))?
            .set_image(path)
            .map_err(|e| format!("tesseract set image: {}", e))?
            .set_variable("tessedit_pageseg_mode", mode.psm())
            .map_err(|e| format!("tesseract psm: {}", e))?
            .get_text()
            .map_err(|e| format!("tesseract recognize: {}", e))?;
        Ok(text)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> String {
        match self.recognize_inner(image, mode) {
            Ok(text) => text,
            Err(e) => {
                warn!("recognition attempt failed, treating cell as unreadable: {}", e);
                String::new()
            }
        }
    }
}

/// Reads one cell: prepares the crop, runs both segmentation attempts and
/// keeps the better candidate.
pub struct CellReader<'a> {
    recognizer: &'a dyn TextRecognizer,
}

impl<'a> CellReader<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer) -> Self {
        CellReader { recognizer }
    }

    /// Returns `(text, confidence)` where confidence is the fraction of the
    /// winning attempt's characters inside the role's expected charset.
    /// Never fails; a hopeless cell reads as the empty string.
    ///
    /// `strict_single_line` skips the block attempt for cells known
    /// to hold one line.
    pub fn read(
        &self,
        cell: &GrayImage,
        role: ColumnRole,
        strict_single_line: bool,
    ) -> (String, f32) {
        let prepared = prepare_for_ocr(cell, MIN_OCR_HEIGHT);

        let first = clean(self.recognizer.recognize(&prepared, SegmentationMode::SingleLine));
        if strict_single_line {
            let score = charset_score(&first, role);
            return (first, score);
        }

        let second = clean(self.recognizer.recognize(&prepared, SegmentationMode::UniformBlock));
        if first == second {
            let score = charset_score(&first, role);
            return (first, score);
        }

        // Prefer the attempt whose characters fit the role; break ties by
        // how many corrections the normalizer would still have to make,
        // then by attempt order.
        let first_score = charset_score(&first, role);
        let second_score = charset_score(&second, role);
        if second_score > first_score + f32::EPSILON
            || ((second_score - first_score).abs() <= f32::EPSILON
                && normalize::correction_count(&second, role)
                    < normalize::correction_count(&first, role))
        {
            (second, second_score)
        } else {
            (first, first_score)
        }
    }

    /// Read a merged section-title band. Titles wrap, so this goes straight
    /// to the block attempt.
    pub fn read_title(&self, band: &GrayImage) -> String {
        let prepared = prepare_for_ocr(band, 60);
        clean(self.recognizer.recognize(&prepared, SegmentationMode::UniformBlock))
    }
}

fn clean(text: String) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fraction of non-space characters the role expects; 0.0 for empty text.
fn charset_score(text: &str, role: ColumnRole) -> f32 {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return 0.0;
    }
    let matching = chars.iter().filter(|&&c| role.expects_char(c)).count();
    matching as f32 / chars.len() as f32
}
