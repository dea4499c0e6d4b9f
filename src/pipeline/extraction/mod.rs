pub mod types;
pub mod format;
pub mod sanitize;
pub mod preprocess;
pub mod pdf;
pub mod pdfium;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use format::*;
pub use sanitize::*;
pub use preprocess::*;
pub use pdf::*;
pub use pdfium::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No text could be extracted from the document")]
    ExtractionFailed,

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF library unavailable: {0}")]
    PdfiumUnavailable(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Extraction task failed: {0}")]
    TaskJoin(String),
}
