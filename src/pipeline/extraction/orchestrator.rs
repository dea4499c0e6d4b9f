use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::format::DocumentFormat;
use super::ocr::build_ocr_engine;
use super::pdf::{join_pages, LopdfTextExtractor};
use super::pdfium::{PdfiumRenderer, PdfiumTextLayer};
use super::preprocess::to_greyscale_png;
use super::sanitize::{clean_text, is_blank};
use super::types::{
    ExtractionMethod, ExtractionResult, OcrEngine, PdfExtractor, PdfPageRenderer, TextExtractor,
};
use super::ExtractionError;
use crate::config::ExtractorConfig;

/// One PDF tier: joined page text plus page count.
type PdfStrategy<'a> = &'a dyn Fn() -> Result<(String, usize), ExtractionError>;

/// Concrete implementation of the text extractor.
///
/// Escalates through strategies of increasing cost and stops at the first
/// one that yields non-blank text. A strategy that errors is treated like
/// one that found nothing. Uses trait objects for every engine so tests
/// can inject mocks.
pub struct DocumentExtractor {
    ocr_engine: Box<dyn OcrEngine + Send + Sync>,
    layout_reader: Box<dyn PdfExtractor + Send + Sync>,
    fallback_reader: Box<dyn PdfExtractor + Send + Sync>,
    pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    render_dpi: u32,
}

impl DocumentExtractor {
    pub fn new(
        ocr_engine: Box<dyn OcrEngine + Send + Sync>,
        layout_reader: Box<dyn PdfExtractor + Send + Sync>,
        fallback_reader: Box<dyn PdfExtractor + Send + Sync>,
        pdf_renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    ) -> Self {
        Self {
            ocr_engine,
            layout_reader,
            fallback_reader,
            pdf_renderer,
            render_dpi: crate::config::DEFAULT_OCR_DPI,
        }
    }

    /// Production wiring: PDFium layout reader, lopdf fallback, PDFium
    /// rasterizer and the configured tesseract engine.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(
            build_ocr_engine(config),
            Box::new(PdfiumTextLayer),
            Box::new(LopdfTextExtractor),
            Box::new(PdfiumRenderer),
        )
        .with_render_dpi(config.render_dpi)
    }

    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }

    /// Run one strategy. Returns cleaned text only when it is non-blank;
    /// errors are logged and count as an empty result.
    fn attempt<F>(&self, method: ExtractionMethod, strategy: F) -> Option<(String, usize)>
    where
        F: FnOnce() -> Result<(String, usize), ExtractionError>,
    {
        match strategy() {
            Ok((raw, pages)) => {
                let text = clean_text(&raw);
                if is_blank(&text) {
                    tracing::info!(method = method.as_str(), "Strategy produced no text, escalating");
                    None
                } else {
                    Some((text, pages))
                }
            }
            Err(e) => {
                tracing::warn!(method = method.as_str(), error = %e, "Strategy failed, escalating");
                None
            }
        }
    }

    fn extract_pdf(&self, pdf_bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let strategies: [(ExtractionMethod, PdfStrategy<'_>); 3] = [
            (ExtractionMethod::NativeTextLayer, &|| {
                let pages = self.layout_reader.extract_text(pdf_bytes)?;
                Ok((join_pages(&pages), pages.len()))
            }),
            (ExtractionMethod::FallbackTextLayer, &|| {
                tracing::info!("Layout text layer empty, trying fallback reader");
                let pages = self.fallback_reader.extract_text(pdf_bytes)?;
                Ok((join_pages(&pages), pages.len()))
            }),
            (ExtractionMethod::OpticalCharacterRecognition, &|| {
                tracing::info!("PDF appears to be scanned, using OCR");
                self.ocr_pdf(pdf_bytes)
            }),
        ];

        for (method, strategy) in strategies {
            if let Some((text, page_count)) = self.attempt(method, strategy) {
                return Ok(ExtractionResult {
                    text,
                    method_used: method,
                    page_count,
                });
            }
        }

        Err(ExtractionError::ExtractionFailed)
    }

    /// Rasterize and OCR every page. A page that fails to render or
    /// recognize is skipped.
    fn ocr_pdf(&self, pdf_bytes: &[u8]) -> Result<(String, usize), ExtractionError> {
        let page_count = self.pdf_renderer.page_count(pdf_bytes)?;
        let mut texts = Vec::with_capacity(page_count);

        for page_idx in 0..page_count {
            tracing::info!("OCR processing page {}/{}", page_idx + 1, page_count);
            let recognized = self
                .pdf_renderer
                .render_page(pdf_bytes, page_idx, self.render_dpi)
                .and_then(|png| to_greyscale_png(&png))
                .and_then(|gray| self.ocr_engine.ocr_image(&gray));
            match recognized {
                Ok(result) => texts.push(result.text),
                Err(e) => {
                    tracing::warn!(page = page_idx + 1, error = %e, "Skipping page that failed OCR");
                }
            }
        }

        Ok((texts.join("\n"), page_count))
    }

    fn extract_image(&self, image_bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let gray = to_greyscale_png(image_bytes)?;
        let ocr_result = self.ocr_engine.ocr_image(&gray)?;
        let text = clean_text(&ocr_result.text);
        if is_blank(&text) {
            return Err(ExtractionError::ExtractionFailed);
        }
        Ok(ExtractionResult {
            text,
            method_used: ExtractionMethod::OpticalCharacterRecognition,
            page_count: 1,
        })
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<ExtractionResult, ExtractionError> {
        tracing::info!(
            path = %path.display(),
            format = format.as_str(),
            "Starting text extraction"
        );

        let bytes = std::fs::read(path)?;

        let result = match format {
            DocumentFormat::PlainText => {
                // Invalid UTF-8 sequences are dropped rather than rejected.
                let decoded = String::from_utf8_lossy(&bytes).replace('\u{FFFD}', "");
                let text = clean_text(&decoded);
                if is_blank(&text) {
                    return Err(ExtractionError::ExtractionFailed);
                }
                ExtractionResult {
                    text,
                    method_used: ExtractionMethod::PlainTextRead,
                    page_count: 1,
                }
            }
            DocumentFormat::Pdf => self.extract_pdf(&bytes)?,
            DocumentFormat::Jpeg | DocumentFormat::Png => self.extract_image(&bytes)?,
        };

        tracing::info!(
            method = result.method_used.as_str(),
            pages = result.page_count,
            text_length = result.text.len(),
            "Text extraction complete"
        );

        Ok(result)
    }
}

/// Resolve the format from the path's extension, then extract.
pub fn extract_path(
    extractor: &dyn TextExtractor,
    path: &Path,
) -> Result<ExtractionResult, ExtractionError> {
    let format = DocumentFormat::from_path(path)?;
    extractor.extract(path, format)
}

/// Run extraction on the blocking pool so async callers stay responsive
/// while file reads, rasterization and OCR run.
pub async fn extract_text_async(
    extractor: Arc<DocumentExtractor>,
    path: PathBuf,
) -> Result<ExtractionResult, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_path(extractor.as_ref(), &path))
        .await
        .map_err(|e| ExtractionError::TaskJoin(e.to_string()))?
}
