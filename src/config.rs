use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "DocuSage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat-completions endpoint (Cerebras-hosted Llama).
pub const DEFAULT_LLM_URL: &str = "https://api.cerebras.ai/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama3.1-8b";

/// Large lab panels (50+ tests) need a generous completion budget.
pub const DEFAULT_MAX_TOKENS: u32 = 32_000;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Fixed seed so repeated analyses of the same document agree.
pub const DEFAULT_LLM_SEED: u64 = 12345;

/// Rasterization DPI for OCR of scanned PDF pages.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Get the application data directory (~/DocuSage/).
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory holding uploaded source documents
pub fn uploads_dir() -> PathBuf {
    app_data_dir().join("uploads")
}

/// Path of the SQLite store
pub fn database_path() -> PathBuf {
    app_data_dir().join("docusage.db")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "docusage_lib=debug,docusage=debug,info"
    } else {
        "docusage_lib=info,docusage=info,warn"
    }
}

/// Remote LLM settings. Built once and handed to the client constructor,
/// so request paths never read the environment.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub top_p: f32,
    pub seed: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LLM_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: 1.0,
            seed: DEFAULT_LLM_SEED,
        }
    }
}

impl AnalyzerConfig {
    /// Read overrides from the process environment.
    ///
    /// - `CEREBRAS_API_KEY`: bearer token (absent means the analyzer is disabled)
    /// - `DOCUSAGE_LLM_URL`: chat-completions endpoint
    /// - `DOCUSAGE_LLM_MODEL`: model name
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("CEREBRAS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(url) = std::env::var("DOCUSAGE_LLM_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("DOCUSAGE_LLM_MODEL") {
            config.model = model;
        }
        if config.api_key.is_none() {
            tracing::warn!("CEREBRAS_API_KEY is not set; analysis calls will fail until configured");
        }
        config
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }
}

/// Which tesseract the OCR tier talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrBackend {
    /// The `tesseract` executable
    Cli,
    /// libtesseract, linked in with the `ocr` feature
    Linked,
}

impl OcrBackend {
    /// `"linked"` (any case) selects the library; anything else the executable.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("linked") {
            Self::Linked
        } else {
            Self::Cli
        }
    }
}

/// Text extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub ocr_backend: OcrBackend,
    /// Path or name of the tesseract executable
    pub tesseract_path: PathBuf,
    /// traineddata directory for the linked engine (None: library default)
    pub tessdata_dir: Option<PathBuf>,
    pub ocr_language: String,
    pub render_dpi: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ocr_backend: OcrBackend::Cli,
            tesseract_path: PathBuf::from("tesseract"),
            tessdata_dir: None,
            ocr_language: "eng".to_string(),
            render_dpi: DEFAULT_OCR_DPI,
        }
    }
}

impl ExtractorConfig {
    /// Environment overrides:
    /// - `DOCUSAGE_OCR_ENGINE`: `cli` or `linked`
    /// - `TESSERACT_PATH`, `TESSERACT_LANG`, `TESSDATA_PREFIX`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(engine) = std::env::var("DOCUSAGE_OCR_ENGINE") {
            config.ocr_backend = OcrBackend::from_name(&engine);
        }
        if let Ok(path) = std::env::var("TESSERACT_PATH") {
            config.tesseract_path = PathBuf::from(path);
        }
        if let Ok(lang) = std::env::var("TESSERACT_LANG") {
            config.ocr_language = lang;
        }
        if let Ok(dir) = std::env::var("TESSDATA_PREFIX") {
            config.tessdata_dir = Some(PathBuf::from(dir));
        }
        config
    }
}
