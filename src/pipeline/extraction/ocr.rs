use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;
use crate::config::{ExtractorConfig, OcrBackend};

/// OCR through the `tesseract` executable.
///
/// Image bytes are written to a temporary PNG and recognized with
/// `tesseract <file> stdout -l <lang>`.
pub struct TesseractCli {
    tesseract_path: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(tesseract_path: &Path, language: &str) -> Self {
        Self {
            tesseract_path: tesseract_path.to_path_buf(),
            language: language.to_string(),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(&config.tesseract_path, &config.ocr_language)
    }

    /// Check whether the executable answers `--version`.
    pub fn is_available(&self) -> bool {
        Command::new(&self.tesseract_path)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let temp_dir = tempfile::tempdir()?;
        let input = temp_dir.path().join("ocr_input.png");
        std::fs::write(&input, image_bytes)?;

        let output = Command::new(&self.tesseract_path)
            .arg(input.as_os_str())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| {
                ExtractionError::OcrInit(format!(
                    "Failed to run tesseract (path='{}'): {e}",
                    self.tesseract_path.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "tesseract CLI recognized text");

        Ok(OcrPageResult {
            text,
            confidence: None,
        })
    }
}

/// Linked libtesseract engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<PathBuf>,
    language: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// `tessdata_dir = None` uses the library's compiled-in search path.
    pub fn new(tessdata_dir: Option<&Path>, language: &str) -> Result<Self, ExtractionError> {
        if let Some(dir) = tessdata_dir {
            let model = dir.join(format!("{}.traineddata", language.split('+').next().unwrap_or("eng")));
            if !model.exists() {
                return Err(ExtractionError::OcrInit(format!(
                    "traineddata not found at {}",
                    model.display()
                )));
            }
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.map(Path::to_path_buf),
            language: language.to_string(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let tessdata = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(tessdata, Some(&self.language))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrPageResult {
            text,
            confidence: Some(confidence),
        })
    }
}

/// Build the OCR engine named by `config.ocr_backend`.
///
/// The linked engine needs the `ocr` feature and its traineddata; when
/// either is missing the executable is used instead.
pub fn build_ocr_engine(config: &ExtractorConfig) -> Box<dyn OcrEngine + Send + Sync> {
    if config.ocr_backend == OcrBackend::Linked {
        #[cfg(feature = "ocr")]
        {
            match BundledTesseract::new(config.tessdata_dir.as_deref(), &config.ocr_language) {
                Ok(engine) => {
                    tracing::info!(language = %config.ocr_language, "Linked tesseract OCR initialized");
                    return Box::new(engine);
                }
                Err(e) => tracing::warn!(
                    error = %e,
                    "Linked tesseract unavailable, using the executable"
                ),
            }
        }
        #[cfg(not(feature = "ocr"))]
        {
            tracing::warn!("Built without the `ocr` feature, using the tesseract executable");
        }
    }

    let cli = TesseractCli::from_config(config);
    if cli.is_available() {
        tracing::info!(path = %cli.tesseract_path.display(), "Tesseract executable found");
    } else {
        tracing::warn!(
            path = %cli.tesseract_path.display(),
            "Tesseract executable not found; scanned documents will fail OCR"
        );
    }
    Box::new(cli)
}

/// Mock OCR engine for unit testing without Tesseract.
/// Counts calls so tests can assert which tiers ran.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: Some(self.confidence),
        })
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for std::sync::Arc<T> {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        (**self).ocr_image(image_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_text_and_counts() {
        let engine = MockOcrEngine::new("WBC 6.1", 0.9);
        let result = engine.ocr_image(&[]).unwrap();
        assert_eq!(result.text, "WBC 6.1");
        assert_eq!(result.confidence, Some(0.9));
        engine.ocr_image(&[]).unwrap();
        assert_eq!(engine.call_count(), 2);
    }

    #[test]
    fn missing_executable_is_init_error() {
        let engine = TesseractCli::new(Path::new("/nonexistent/bin/tesseract-xyz"), "eng");
        assert!(!engine.is_available());
        let result = engine.ocr_image(&[0u8; 100]);
        assert!(matches!(result, Err(ExtractionError::OcrInit(_))));
    }

    #[test]
    fn build_uses_configured_executable() {
        let config = ExtractorConfig {
            tesseract_path: PathBuf::from("/nonexistent/bin/tesseract-xyz"),
            ..ExtractorConfig::default()
        };
        let engine = build_ocr_engine(&config);
        assert!(matches!(
            engine.ocr_image(&[0u8; 16]),
            Err(ExtractionError::OcrInit(msg)) if msg.contains("tesseract-xyz")
        ));
    }

    #[test]
    fn linked_without_traineddata_falls_back_to_executable() {
        let tessdata = tempfile::tempdir().unwrap();
        let config = ExtractorConfig {
            ocr_backend: OcrBackend::Linked,
            tessdata_dir: Some(tessdata.path().to_path_buf()),
            tesseract_path: PathBuf::from("/nonexistent/bin/tesseract-xyz"),
            ..ExtractorConfig::default()
        };
        let engine = build_ocr_engine(&config);
        assert!(matches!(
            engine.ocr_image(&[0u8; 16]),
            Err(ExtractionError::OcrInit(msg)) if msg.contains("tesseract-xyz")
        ));
    }

    #[test]
    fn from_config_uses_language() {
        let config = ExtractorConfig {
            ocr_language: "eng+fra".into(),
            ..ExtractorConfig::default()
        };
        let engine = TesseractCli::from_config(&config);
        assert_eq!(engine.language, "eng+fra");
    }
}
