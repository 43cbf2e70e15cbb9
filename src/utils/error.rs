use thiserror::Error;

use crate::render::RenderError;

/// Document-level failures. Cell- and row-level problems never surface here;
/// they are recovered locally and accumulated into the extraction report.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not open document: {0}")]
    Document(#[from] RenderError),

    #[error("no page of the document could be rendered")]
    NoPages,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
