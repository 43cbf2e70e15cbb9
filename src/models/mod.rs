pub mod data;
pub mod layout;
pub mod report;

pub use data::*;
pub use layout::{ColumnRole, StatementLayout, RENDER_DPI};
pub use report::{Diagnostic, Extraction, ExtractionReport, FlaggedRow, QuarantineReason, QuarantinedRow};
