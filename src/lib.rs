pub mod models;
pub mod render;
pub mod processing;
pub mod classification;
pub mod assemble;
pub mod extractor;
pub mod utils;

pub use extractor::StatementExtractor;
pub use models::{CategoryKey, CategoryTables, Extraction, ExtractionReport};
pub use render::{PageRenderer, PdfiumRenderer};
pub use utils::ExtractError;
