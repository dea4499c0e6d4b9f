use tracing::{debug, warn};

use super::types::{PageExtraction, PdfExtractor};
use super::ExtractionError;

/// Generic PDF text-layer reader built on lopdf.
///
/// Second tier of the PDF cascade. A page that fails to decode is logged
/// and skipped; only a document that cannot be opened at all is an error.
pub struct LopdfTextExtractor;

impl PdfExtractor for LopdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        let document = lopdf::Document::load_mem(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());

        for page_number in page_numbers {
            match document.extract_text(&[page_number]) {
                Ok(text) => pages.push(PageExtraction {
                    page_number: page_number as usize,
                    text,
                }),
                Err(e) => {
                    warn!(page = page_number, error = %e, "Skipping unreadable PDF page");
                }
            }
        }

        debug!(pages = pages.len(), "lopdf text layer read");
        Ok(pages)
    }
}

/// Concatenate page texts with newline separators.
pub fn join_pages(pages: &[PageExtraction]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}


#[cfg(test)]
mod tests {
    use super::test_pdf::make_test_pdf;
    use super::*;

    #[test]
    fn reads_text_from_digital_pdf() {
        let pdf = make_test_pdf(&["Hemoglobin 13.5 g/dL"]);
        let pages = LopdfTextExtractor.extract_text(&pdf).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.contains("Hemoglobin"), "got: {:?}", pages[0].text);
    }

    #[test]
    fn keeps_page_order() {
        let pdf = make_test_pdf(&["First page", "Second page"]);
        let pages = LopdfTextExtractor.extract_text(&pdf).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[1].page_number, 2);
        let joined = join_pages(&pages);
        let first = joined.find("First").unwrap();
        let second = joined.find("Second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn blank_page_yields_blank_text() {
        let pdf = make_test_pdf(&[""]);
        let pages = LopdfTextExtractor.extract_text(&pdf).unwrap();
        assert!(join_pages(&pages).trim().is_empty());
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let result = LopdfTextExtractor.extract_text(b"not a pdf");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn join_pages_uses_newlines() {
        let pages = vec![
            PageExtraction { page_number: 1, text: "a".into() },
            PageExtraction { page_number: 2, text: "b".into() },
        ];
        assert_eq!(join_pages(&pages), "a\nb");
    }
}
