pub mod types;
pub mod client;
pub mod prompt;
pub mod framing;
pub mod salvage;
pub mod parser;
pub mod questions;
pub mod analyzer;

pub use types::*;
pub use client::*;
pub use prompt::*;
pub use framing::*;
pub use salvage::*;
pub use parser::*;
pub use questions::*;
pub use analyzer::*;

use thiserror::Error;

/// Errors from the remote model call. Malformed model output is never an
/// error here: the parsers downgrade it to a flagged partial result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("LLM API key not configured")]
    MissingApiKey,

    #[error("LLM service unreachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("LLM service returned error (status {status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Unexpected LLM response shape: {0}")]
    ResponseShape(String),
}
