//! Table region location on a rendered page.
//!
//! Statement tables are fully ruled, so detection works on projection
//! profiles: horizontal rule lines are pixel rows with a long contiguous
//! dark run, vertical separators are detected per row band the same way.
//! Detecting separators band by band keeps merged section-title rows (one
//! span across the table) distinguishable from data rows.

use image::GrayImage;
use log::{debug, warn};

use crate::models::{Rect, RowBand, StatementLayout, TableRegion};

/// Expected minimum table dimensions, in page pixels at 300 DPI.
#[derive(Debug, Clone, Copy)]
pub struct RegionHint {
    pub min_table_width: u32,
    pub min_table_height: u32,
}

impl Default for RegionHint {
    fn default() -> Self {
        // Two inches wide, two data rows tall.
        RegionHint { min_table_width: 600, min_table_height: 120 }
    }
}

/// Result of scanning one page. Discarded entries describe candidate tables
/// whose column structure did not match any known statement layout.
#[derive(Debug, Default)]
pub struct LocatedTables {
    pub regions: Vec<TableRegion>,
    pub discarded: Vec<String>,
}

/// A detected horizontal rule line.
#[derive(Debug, Clone, Copy)]
struct RuleLine {
    y: u32,
    x0: u32,
    x1: u32,
}

pub struct RegionLocator {
    /// Pixels darker than this count as ink.
    pub dark_threshold: u8,
    /// Fraction of a band's height a column of pixels must cover to count
    /// as a vertical separator.
    pub separator_fill: f32,
    /// Maximum vertical gap between rule lines of the same table.
    pub max_row_gap: u32,
}

impl Default for RegionLocator {
    fn default() -> Self {
        RegionLocator { dark_threshold: 100, separator_fill: 0.75, max_row_gap: 260 }
    }
}

impl RegionLocator {
    /// Find transaction tables on a page, ordered top to bottom. A page with
    /// no table yields an empty result, not an error.
    pub fn locate(&self, page: &GrayImage, page_index: usize, hint: &RegionHint) -> LocatedTables {
        let mut out = LocatedTables::default();
        let rules = self.horizontal_rules(page, hint.min_table_width);
        if rules.len() < 2 {
            return out;
        }

        for group in self.group_rules(&rules, hint) {
            let bounds = Rect {
                x0: group.iter().map(|r| r.x0).min().unwrap_or(0),
                y0: group.first().map(|r| r.y).unwrap_or(0),
                x1: group.iter().map(|r| r.x1).max().unwrap_or(0),
                y1: group.last().map(|r| r.y).unwrap_or(0),
            };
            let bands = self.bands_between(page, &group, bounds.x0, bounds.x1);
            if bands.is_empty() {
                continue;
            }

            let region = TableRegion { page_index, bounds, bands };
            let columns = region.column_count();
            match StatementLayout::from_column_count(columns) {
                Some(_) => {
                    debug!(
                        "page {}: table at y {}..{} with {} bands, {} columns",
                        page_index,
                        bounds.y0,
                        bounds.y1,
                        region.bands.len(),
                        columns
                    );
                    out.regions.push(region);
                }
                None => {
                    let msg = format!(
                        "table at y {}..{} discarded: {} columns match no known layout",
                        bounds.y0, bounds.y1, columns
                    );
                    warn!("page {}: {}", page_index, msg);
                    out.discarded.push(msg);
                }
            }
        }
        out
    }

    /// Rows whose longest dark run is at least `min_width`, collapsed so a
    /// rule several pixels thick reports once.
    fn horizontal_rules(&self, page: &GrayImage, min_width: u32) -> Vec<RuleLine> {
        let mut rules: Vec<RuleLine> = Vec::new();
        for y in 0..page.height() {
            if let Some((x0, x1)) = self.longest_dark_run(page, y) {
                if x1 - x0 >= min_width {
                    match rules.last_mut() {
                        // Same physical line, one pixel lower.
                        Some(last) if y <= last.y + 2 => {
                            last.y = y;
                            last.x0 = last.x0.min(x0);
                            last.x1 = last.x1.max(x1);
                        }
                        _ => rules.push(RuleLine { y, x0, x1 }),
                    }
                }
            }
        }
        rules
    }

    /// Longest run of dark pixels in row `y`, tolerating gaps up to 3 px
    /// (scan noise breaks printed rules).
    fn longest_dark_run(&self, page: &GrayImage, y: u32) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        let mut run_start: Option<u32> = None;
        let mut last_dark: Option<u32> = None;

        for x in 0..page.width() {
            let dark = page.get_pixel(x, y)[0] < self.dark_threshold;
            if dark {
                if run_start.is_none() {
                    run_start = Some(x);
                }
                last_dark = Some(x);
            } else if let (Some(start), Some(end)) = (run_start, last_dark) {
                if x - end > 3 {
                    if best.map_or(true, |(b0, b1)| end - start > b1 - b0) {
                        best = Some((start, end));
                    }
                    run_start = None;
                    last_dark = None;
                }
            }
        }
        if let (Some(start), Some(end)) = (run_start, last_dark) {
            if best.map_or(true, |(b0, b1)| end - start > b1 - b0) {
                best = Some((start, end));
            }
        }
        best
    }

    /// Split the rule lines into vertically consecutive groups with
    /// overlapping x-extent; each group is one table candidate.
    fn group_rules(&self, rules: &[RuleLine], hint: &RegionHint) -> Vec<Vec<RuleLine>> {
        let mut groups: Vec<Vec<RuleLine>> = Vec::new();
        let mut current: Vec<RuleLine> = Vec::new();

        for &rule in rules {
            match current.last() {
                Some(prev)
                    if rule.y - prev.y <= self.max_row_gap
                        && overlap(prev, &rule) >= 0.8 =>
                {
                    current.push(rule);
                }
                Some(_) => {
                    groups.push(std::mem::take(&mut current));
                    current.push(rule);
                }
                None => current.push(rule),
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        groups.retain(|g| {
            g.len() >= 3
                && g.last().unwrap().y - g.first().unwrap().y >= hint.min_table_height
        });
        groups
    }

    /// Build a row band for each gap between consecutive rule lines, with
    /// the vertical separators detected inside that band only.
    fn bands_between(
        &self,
        page: &GrayImage,
        rules: &[RuleLine],
        x0: u32,
        x1: u32,
    ) -> Vec<RowBand> {
        let mut bands = Vec::new();
        for pair in rules.windows(2) {
            let y0 = pair[0].y + 2;
            let y1 = pair[1].y.saturating_sub(1);
            if y1 <= y0 + 8 {
                continue; // doubled rule, not a row
            }
            let separators = self.vertical_separators(page, x0, x1, y0, y1);
            let cell_spans = spans_from_separators(&separators, x0, x1);
            bands.push(RowBand { y0, y1, cell_spans });
        }
        bands
    }

    /// Pixel columns covering most of the band height with ink.
    fn vertical_separators(&self, page: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32) -> Vec<u32> {
        let height = (y1 - y0) as f32;
        let needed = (height * self.separator_fill).ceil() as u32;
        let mut separators: Vec<u32> = Vec::new();

        for x in x0..=x1.min(page.width().saturating_sub(1)) {
            let dark = (y0..y1)
                .filter(|&y| page.get_pixel(x, y)[0] < self.dark_threshold)
                .count() as u32;
            if dark >= needed {
                match separators.last() {
                    Some(&last) if x <= last + 2 => {
                        *separators.last_mut().unwrap() = x;
                    }
                    _ => separators.push(x),
                }
            }
        }
        separators
    }
}

fn overlap(a: &RuleLine, b: &RuleLine) -> f32 {
    let lo = a.x0.max(b.x0);
    let hi = a.x1.min(b.x1);
    if hi <= lo {
        return 0.0;
    }
    let shorter = (a.x1 - a.x0).min(b.x1 - b.x0).max(1);
    (hi - lo) as f32 / shorter as f32
}

/// Cells sit between consecutive separators. A band with fewer than two
/// separators is a merged row spanning the full table width.
fn spans_from_separators(separators: &[u32], x0: u32, x1: u32) -> Vec<(u32, u32)> {
    if separators.len() < 2 {
        return vec![(x0, x1)];
    }
    separators
        .windows(2)
        .map(|pair| (pair[0] + 1, pair[1].saturating_sub(1)))
        .filter(|(a, b)| b > a && b - a >= 4)
        .collect()
}
