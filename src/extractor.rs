//! Pipeline orchestration: render -> locate -> read -> normalize ->
//! classify -> assemble, with all cell- and row-level failures recovered
//! into the report.

use image::GrayImage;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::assemble::TableAssembler;
use crate::classification::{classify_row, classify_section, is_header_row, is_total_row};
use crate::models::{
    CardholderType, ColumnRole, Diagnostic, Extraction, ExtractionReport, FlaggedRow, PlanType,
    QuarantinedRow, RawCell, RowBand, RowPosition, SectionContext, Sign, StatementLayout,
    TableRegion, RENDER_DPI,
};
use crate::processing::preprocess::{crop_cell, CELL_PAD};
use crate::processing::{
    CellReader, FieldNormalizer, RegionHint, RegionLocator, SignDetector, TextRecognizer,
};
use crate::render::PageRenderer;
use crate::utils::ExtractError;

/// One recognized data row, still untyped.
struct ReadRow {
    band_index: usize,
    cells: Vec<RawCell>,
    sign: Sign,
}

/// Drives a full document through the extraction pipeline.
///
/// The renderer and recognizer are black-box collaborators injected at the
/// trait seam; everything else is fixed statement-layout knowledge.
pub struct StatementExtractor<'a> {
    renderer: &'a dyn PageRenderer,
    recognizer: &'a dyn TextRecognizer,
    locator: RegionLocator,
    sign_detector: SignDetector,
    hint: RegionHint,
}

impl<'a> StatementExtractor<'a> {
    pub fn new(renderer: &'a dyn PageRenderer, recognizer: &'a dyn TextRecognizer) -> Self {
        StatementExtractor {
            renderer,
            recognizer,
            locator: RegionLocator::default(),
            sign_detector: SignDetector::default(),
            hint: RegionHint::default(),
        }
    }

    /// Read a statement file and extract it.
    pub fn extract_path(&self, path: impl AsRef<std::path::Path>) -> Result<Extraction, ExtractError> {
        let document = std::fs::read(path)?;
        self.extract(&document)
    }

    /// Run the whole pipeline. The run always completes and returns whatever
    /// buckets could be assembled plus the itemized report; only
    /// document-level failures (unopenable document, zero renderable pages)
    /// surface as `Err`.
    pub fn extract(&self, document: &[u8]) -> Result<Extraction, ExtractError> {
        let page_count = self.renderer.page_count(document)?;
        if page_count == 0 {
            return Err(ExtractError::NoPages);
        }
        info!("document opened: {} page(s)", page_count);

        let mut report = ExtractionReport::default();
        let mut assembler = TableAssembler::new();
        let mut normalizer = FieldNormalizer::new();
        let mut last_section: Option<SectionContext> = None;
        let mut rendered_any = false;

        for page_index in 0..page_count {
            let page = match self.renderer.render(document, page_index, RENDER_DPI) {
                Ok(page) => page,
                Err(e) => {
                    warn!("page {} skipped: {}", page_index, e);
                    report.diagnostics.push(Diagnostic {
                        page: page_index,
                        message: format!("page could not be rendered: {}", e),
                    });
                    continue;
                }
            };
            rendered_any = true;

            let located = self.locator.locate(&page, page_index, &self.hint);
            for message in located.discarded {
                report.diagnostics.push(Diagnostic { page: page_index, message });
            }
            if located.regions.is_empty() {
                report.diagnostics.push(Diagnostic {
                    page: page_index,
                    message: "no transaction table detected".to_string(),
                });
                continue;
            }

            for (region_index, region) in located.regions.iter().enumerate() {
                self.process_region(
                    &page,
                    region,
                    region_index,
                    &mut normalizer,
                    &mut assembler,
                    &mut report,
                    &mut last_section,
                );
            }
        }

        if !rendered_any {
            return Err(ExtractError::NoPages);
        }

        let extraction = Extraction { tables: assembler.finish(), report };
        info!(
            "extraction finished: {} row(s) bucketed, {} quarantined, {} flagged",
            extraction.tables.row_count(),
            extraction.report.quarantined.len(),
            extraction.report.flagged.len()
        );
        Ok(extraction)
    }

    fn process_region(
        &self,
        page: &GrayImage,
        region: &TableRegion,
        region_index: usize,
        normalizer: &mut FieldNormalizer,
        assembler: &mut TableAssembler,
        report: &mut ExtractionReport,
        last_section: &mut Option<SectionContext>,
    ) {
        let reader = CellReader::new(self.recognizer);

        // Leading merged bands are the section title.
        let mut title = String::new();
        let mut data_start = 0;
        for band in &region.bands {
            if band.cell_spans.len() > 1 {
                break;
            }
            if let Some((x0, x1)) = band.cell_spans.first() {
                if let Some(crop) = crop_cell(page, *x0, band.y0, *x1, band.y1, CELL_PAD) {
                    title.push(' ');
                    title.push_str(&reader.read_title(&crop));
                }
            }
            data_start += 1;
        }

        let context = match classify_section(&title) {
            Some(ctx) => {
                *last_section = Some(ctx);
                ctx
            }
            // Headerless continuation: inherit the section that precedes it.
            None => last_section.unwrap_or(SectionContext {
                plan: None,
                cardholder: CardholderType::Primary,
            }),
        };

        // The locator only admits 5- and 7-column regions.
        let layout = match StatementLayout::from_column_count(region.column_count()) {
            Some(layout) => layout,
            None => return,
        };
        // A 7-column table is installment-shaped no matter what the title
        // or the inherited context says.
        let context = match layout {
            StatementLayout::Installment => SectionContext {
                plan: Some(PlanType::Installment),
                cardholder: context.cardholder,
            },
            StatementLayout::Regular => context,
        };
        debug!(
            "page {} region {}: {:?} layout, section {:?}",
            region.page_index, region_index, layout, context
        );

        let roles = layout.roles();
        let data_bands: Vec<(usize, &RowBand)> = region.bands[data_start..]
            .iter()
            .enumerate()
            .map(|(i, band)| (data_start + i, band))
            .filter(|(_, band)| band.cell_spans.len() >= 3)
            .collect();

        // Cells are independent; recognition dominates wall-clock time, so
        // rows fan out across the worker pool. The indexed collect keeps
        // document order regardless of completion order.
        let sign_detector = &self.sign_detector;
        let rows: Vec<ReadRow> = data_bands
            .par_iter()
            .map(|&(band_index, band)| read_band(page, &reader, sign_detector, band_index, band, roles))
            .collect();

        for row in rows {
            let mut texts: Vec<String> = row.cells.iter().map(|c| c.text.clone()).collect();
            texts.resize(layout.column_count(), String::new());

            if texts.iter().all(|t| t.is_empty()) {
                continue;
            }
            if is_header_row(&texts) || is_total_row(&texts) {
                continue;
            }

            let position = RowPosition {
                page: region.page_index,
                region: region_index,
                row: row.band_index,
            };
            let normalized = match layout {
                StatementLayout::Regular => {
                    normalizer.normalize_regular_row(&texts, row.sign, position)
                }
                StatementLayout::Installment => {
                    normalizer.normalize_installment_row(&texts, position)
                }
            };

            match normalized {
                Ok(normalized) => {
                    let class = classify_row(&normalized.description, context);
                    if class.ambiguous {
                        report.flagged.push(FlaggedRow {
                            position,
                            note: "no section context; classified as regular for review"
                                .to_string(),
                        });
                    }
                    assembler.push(normalized, class);
                }
                Err(reason) => {
                    warn!("row at {:?} quarantined: {}", position, reason);
                    report.quarantined.push(QuarantinedRow {
                        position,
                        raw_cells: texts,
                        reason,
                    });
                }
            }
        }
    }
}

/// Read every cell of one row band. The sign-marker column goes through
/// pixel analysis, everything else through the cell reader.
fn read_band(
    page: &GrayImage,
    reader: &CellReader<'_>,
    sign_detector: &SignDetector,
    band_index: usize,
    band: &RowBand,
    roles: &[ColumnRole],
) -> ReadRow {
    let mut cells = Vec::with_capacity(band.cell_spans.len());
    let mut sign = Sign::Unknown;

    for (column, &(x0, x1)) in band.cell_spans.iter().enumerate() {
        let role = roles.get(column).copied().unwrap_or(ColumnRole::FreeText);
        if role == ColumnRole::SignMarker {
            // No padding here: the analysis window must not contain rule
            // lines.
            if let Some(crop) = crop_cell(page, x0, band.y0, x1, band.y1, 0) {
                sign = sign_detector.detect(&crop);
            }
            cells.push(RawCell {
                row: band_index,
                column,
                text: String::new(),
                confidence: 1.0,
            });
            continue;
        }

        let (text, confidence) = match crop_cell(page, x0, band.y0, x1, band.y1, CELL_PAD) {
            Some(crop) => reader.read(&crop, role, false),
            None => (String::new(), 0.0),
        };
        cells.push(RawCell { row: band_index, column, text, confidence });
    }

    ReadRow { band_index, cells, sign }
}
