use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{AnalysisResult, Question};
use super::enums::DocumentStatus;

/// Stored metadata for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: Uuid,
    pub filename: String,
    /// MIME type declared at upload
    pub file_type: String,
    pub upload_time: NaiveDateTime,
    pub status: DocumentStatus,
    pub processed_time: Option<NaiveDateTime>,
    pub document_type: Option<String>,
}

impl DocumentRecord {
    pub fn new(document_id: Uuid, filename: &str, file_type: &str) -> Self {
        Self {
            document_id,
            filename: filename.to_string(),
            file_type: file_type.to_string(),
            upload_time: chrono::Utc::now().naive_utc(),
            status: DocumentStatus::Uploaded,
            processed_time: None,
            document_type: None,
        }
    }
}

/// Everything produced by one run of the pipeline over a document.
/// This is the payload appended to the analyses table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_id: Uuid,
    pub document_type: String,
    pub extracted_text: String,
    pub analysis: AnalysisResult,
    pub questions: Vec<Question>,
    pub processed_at: NaiveDateTime,
}
