pub mod normalize;
pub mod ocr;
pub mod preprocess;
pub mod regions;
pub mod sign;

pub use normalize::FieldNormalizer;
pub use ocr::{CellReader, SegmentationMode, TesseractRecognizer, TextRecognizer};
pub use regions::{RegionHint, RegionLocator};
pub use sign::SignDetector;
