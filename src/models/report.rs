use serde::Serialize;
use thiserror::Error;

use super::data::{CategoryTables, RowPosition};
use crate::models::layout::ColumnRole;

/// Why a row ended up in quarantine instead of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum QuarantineReason {
    #[error("unparseable date {text:?} after correction")]
    UnparseableDate { text: String },
    #[error("unparseable amount {text:?} after correction")]
    UnparseableAmount { text: String },
    #[error("date {text:?} outside the plausible statement period")]
    ImplausibleDate { text: String },
    #[error("required {role:?} cell came back empty")]
    MissingField { role: ColumnRole },
}

/// A row the pipeline could not turn into a valid `NormalizedRow`.
/// Retained with its raw text for manual correction, never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantinedRow {
    pub position: RowPosition,
    /// Raw recognized text of every cell, in column order.
    pub raw_cells: Vec<String>,
    pub reason: QuarantineReason,
}

/// A row that was classified on a best-guess basis and should be reviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedRow {
    pub position: RowPosition,
    pub note: String,
}

/// Page-level notice that did not stop the run (unrendered page, page with
/// no table, discarded region).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub page: usize,
    pub message: String,
}

/// Everything the run wants a human to look at afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub quarantined: Vec<QuarantinedRow>,
    pub flagged: Vec<FlaggedRow>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractionReport {
    pub fn is_clean(&self) -> bool {
        self.quarantined.is_empty() && self.flagged.is_empty() && self.diagnostics.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of a full document run: whatever buckets could be assembled plus
/// the itemized report.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub tables: CategoryTables,
    pub report: ExtractionReport,
}
