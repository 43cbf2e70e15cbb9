//! Page rasterization seam.
//!
//! The pipeline consumes rendered pages through the `PageRenderer` trait and
//! treats the PDF engine as a black box. `PdfiumRenderer` is the stock
//! implementation; tests substitute synthetic pages.

use image::GrayImage;
use pdfium_render::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render engine unavailable: {0}")]
    Engine(String),

    #[error("corrupt or unsupported document: {0}")]
    BadDocument(String),

    #[error("page {index} out of range")]
    PageOutOfRange { index: usize },

    #[error("failed to rasterize page {index}: {message}")]
    Raster { index: usize, message: String },
}

/// `render` produces a grayscale raster of one page at the requested DPI.
/// A failed page is fatal for that page only; the caller skips and reports.
pub trait PageRenderer {
    fn page_count(&self, document: &[u8]) -> Result<usize, RenderError>;

    fn render(&self, document: &[u8], page_index: usize, dpi: u32)
        -> Result<GrayImage, RenderError>;
}

/// Renders statement pages through pdfium. The document is reloaded per call;
/// statements are a handful of pages and load time is dwarfed by recognition.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    /// Binds to the system pdfium library, falling back to one shipped next
    /// to the executable.
    pub fn new() -> Result<Self, RenderError> {
        let bindings = Pdfium::bind_to_system_library()
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            })
            .map_err(|e| RenderError::Engine(e.to_string()))?;
        Ok(PdfiumRenderer { pdfium: Pdfium::new(bindings) })
    }

    fn load<'a>(&'a self, document: &[u8]) -> Result<PdfDocument<'a>, RenderError> {
        self.pdfium
            .load_pdf_from_byte_vec(document.to_vec(), None)
            .map_err(|e| RenderError::BadDocument(e.to_string()))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, document: &[u8]) -> Result<usize, RenderError> {
        Ok(self.load(document)?.pages().len() as usize)
    }

    fn render(&self, document: &[u8], page_index: usize, dpi: u32)
        -> Result<GrayImage, RenderError>
    {
        let doc = self.load(document)?;
        let page = doc
            .pages()
            .get(page_index as u16)
            .map_err(|_| RenderError::PageOutOfRange { index: page_index })?;

        // Points are 1/72 inch; scale the page width to the requested DPI.
        let target_width = (page.width().value * dpi as f32 / 72.0).round() as i32;
        let config = PdfRenderConfig::new().set_target_width(target_width);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RenderError::Raster { index: page_index, message: e.to_string() })?;

        Ok(bitmap.as_image().to_luma8())
    }
}
