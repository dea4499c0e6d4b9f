use std::path::Path;

use serde::{Deserialize, Serialize};

use super::format::DocumentFormat;
use super::ExtractionError;

/// Result of text extraction from a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method_used: ExtractionMethod,
    pub page_count: usize,
}

/// Which strategy produced the text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Plain text file, read directly
    PlainTextRead,
    /// Layout-aware PDF text layer (PDFium)
    NativeTextLayer,
    /// Generic PDF text layer (lopdf), page errors skipped
    FallbackTextLayer,
    OpticalCharacterRecognition,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainTextRead => "plain_text_read",
            Self::NativeTextLayer => "native_text_layer",
            Self::FallbackTextLayer => "fallback_text_layer",
            Self::OpticalCharacterRecognition => "optical_character_recognition",
        }
    }
}

/// Per-page text from a PDF reader
#[derive(Debug, Clone, PartialEq)]
pub struct PageExtraction {
    /// 1-based
    pub page_number: usize,
    pub text: String,
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// 0.0..=1.0, when the engine reports one
    pub confidence: Option<f32>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF text-layer reader abstraction. Both cascade readers implement it.
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

/// Rasterizes PDF pages for OCR.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render one page (0-based) to PNG bytes.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Main extraction orchestrator trait
pub trait TextExtractor {
    fn extract(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<ExtractionResult, ExtractionError>;
}
