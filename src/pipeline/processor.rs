//! Document analysis orchestrator.
//!
//! Drives one document through the pipeline:
//! extract → classify → analyze → questions → persist.
//!
//! Engines are injected as trait objects (`TextExtractor`, `LlmClient`)
//! so the whole flow runs against mocks in tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::{AnalyzerConfig, ExtractorConfig};
use crate::db::{self, DatabaseError};
use crate::models::{AnalysisResult, DocumentAnalysis, DocumentStatus};
use crate::pipeline::analysis::{
    salvage_complete_records, AnalysisError, ChatCompletionsClient, MedicalAnalyzer,
};
use crate::pipeline::extraction::{extract_path, DocumentExtractor, ExtractionError, TextExtractor};

/// A lab panel usually has at least this many results; fewer can mean
/// the model stopped early.
const EXPECTED_MIN_FINDINGS: usize = 20;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct DocumentAnalyzer {
    extractor: Box<dyn TextExtractor + Send + Sync>,
    analyzer: MedicalAnalyzer,
}

impl DocumentAnalyzer {
    pub fn new(extractor: Box<dyn TextExtractor + Send + Sync>, analyzer: MedicalAnalyzer) -> Self {
        Self {
            extractor,
            analyzer,
        }
    }

    /// Production wiring: the extraction cascade plus the HTTP chat client.
    pub fn from_config(
        extractor_config: &ExtractorConfig,
        analyzer_config: AnalyzerConfig,
    ) -> Result<Self, ProcessingError> {
        let client = ChatCompletionsClient::new(analyzer_config)?;
        tracing::info!(model = client.model(), "Document analyzer using LLM model");
        Ok(Self::new(
            Box::new(DocumentExtractor::from_config(extractor_config)),
            MedicalAnalyzer::new(Box::new(client)),
        ))
    }

    /// `from_config` on the blocking pool. The blocking HTTP client must not
    /// be built on an async worker thread.
    pub async fn from_config_async(
        extractor_config: ExtractorConfig,
        analyzer_config: AnalyzerConfig,
    ) -> Result<Arc<Self>, ProcessingError> {
        tokio::task::spawn_blocking(move || Self::from_config(&extractor_config, analyzer_config))
            .await
            .map_err(|e| ProcessingError::TaskJoin(e.to_string()))?
            .map(Arc::new)
    }

    /// Run the full pipeline for a document already registered in the
    /// database. The stored status ends as `completed`, or `failed` if any
    /// stage returned an error.
    pub fn process(
        &self,
        document_id: &Uuid,
        path: &Path,
        conn: &Connection,
    ) -> Result<DocumentAnalysis, ProcessingError> {
        let started = chrono::Utc::now().naive_utc();
        db::update_document_status(conn, document_id, DocumentStatus::Processing, &started)?;

        match self.run_stages(document_id, path, conn) {
            Ok(result) => {
                db::update_document_status(
                    conn,
                    document_id,
                    DocumentStatus::Completed,
                    &result.processed_at,
                )?;
                tracing::info!(
                    document_id = %document_id,
                    document_type = %result.document_type,
                    findings = result.analysis.findings.len(),
                    tier = result.analysis.recovery_tier.as_str(),
                    "Processing complete"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(document_id = %document_id, error = %e, "Processing failed");
                let now = chrono::Utc::now().naive_utc();
                if let Err(status_err) =
                    db::update_document_status(conn, document_id, DocumentStatus::Failed, &now)
                {
                    tracing::warn!(
                        document_id = %document_id,
                        error = %status_err,
                        "Failed to mark document as failed"
                    );
                }
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        document_id: &Uuid,
        path: &Path,
        conn: &Connection,
    ) -> Result<DocumentAnalysis, ProcessingError> {
        tracing::info!(document_id = %document_id, "Processing: starting extraction");
        let extraction = extract_path(self.extractor.as_ref(), path)?;

        tracing::info!(document_id = %document_id, "Processing: classifying");
        let document_type = self.analyzer.classify_document(&extraction.text)?;

        tracing::info!(
            document_id = %document_id,
            text_length = extraction.text.len(),
            "Processing: analyzing"
        );
        let analysis = self
            .analyzer
            .analyze_document(&extraction.text, &document_type)?;
        if analysis.findings.len() < EXPECTED_MIN_FINDINGS {
            tracing::warn!(
                document_id = %document_id,
                findings = analysis.findings.len(),
                "Fewer findings than a typical panel, output may be truncated"
            );
        }

        tracing::info!(document_id = %document_id, "Processing: generating questions");
        let questions = match self
            .analyzer
            .generate_questions(&analysis.findings, &document_type)
        {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    error = %e,
                    "Question generation failed, continuing without questions"
                );
                Vec::new()
            }
        };

        let result = DocumentAnalysis {
            document_id: *document_id,
            document_type,
            extracted_text: extraction.text,
            analysis,
            questions,
            processed_at: chrono::Utc::now().naive_utc(),
        };

        db::update_document_content(
            conn,
            document_id,
            &result.document_type,
            &result.extracted_text,
        )?;
        db::save_analysis(conn, &result)?;

        Ok(result)
    }

    /// Run `process` on the blocking pool with its own connection to
    /// `db_path`, leaving the async runtime free while extraction and
    /// model calls run.
    pub async fn process_async(
        self: Arc<Self>,
        document_id: Uuid,
        path: PathBuf,
        db_path: PathBuf,
    ) -> Result<DocumentAnalysis, ProcessingError> {
        tokio::task::spawn_blocking(move || {
            let conn = db::open_database(&db_path)?;
            self.process(&document_id, &path, &conn)
        })
        .await
        .map_err(|e| ProcessingError::TaskJoin(e.to_string()))?
    }

    /// Patient-facing summary of a processed document's stored text.
    /// `None` when the document has no extracted text yet.
    pub fn summarize_stored(
        &self,
        conn: &Connection,
        document_id: &Uuid,
    ) -> Result<Option<String>, ProcessingError> {
        let Some(text) = db::get_extracted_text(conn, document_id)? else {
            tracing::info!(document_id = %document_id, "No extracted text to summarize");
            return Ok(None);
        };
        let summary = self.analyzer.generate_summary(&text)?;
        tracing::info!(document_id = %document_id, chars = summary.len(), "Summary generated");
        Ok(Some(summary))
    }
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// Re-run the strict record pattern over the stored raw response of a
/// document's latest analysis, then rewrite its findings and counts.
///
/// Returns `None` when there is no analysis, no raw response, or no
/// complete record in it.
pub fn resalvage_stored_analysis(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Option<AnalysisResult>, ProcessingError> {
    let Some(mut stored) = db::get_latest_analysis(conn, document_id)? else {
        tracing::warn!(document_id = %document_id, "No analysis stored");
        return Ok(None);
    };

    let Some(raw) = stored.data.analysis.raw_response.as_deref() else {
        tracing::info!(document_id = %document_id, "Analysis has no raw response to re-salvage");
        return Ok(None);
    };

    let findings = salvage_complete_records(raw);
    if findings.is_empty() {
        tracing::warn!(document_id = %document_id, "No complete records in raw response");
        return Ok(None);
    }

    let previous = stored.data.analysis.findings.len();
    let analysis = &mut stored.data.analysis;
    analysis.findings = findings;
    analysis.recount();
    analysis.error = None;

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    db::update_analysis(&tx, stored.id, &stored.data)?;
    db::replace_findings(
        &tx,
        document_id,
        &stored.data.analysis.findings,
        &stored.data.processed_at,
    )?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        document_id = %document_id,
        previous,
        recovered = stored.data.analysis.findings.len(),
        urgent = stored.data.analysis.urgent_findings_count,
        monitor = stored.data.analysis.monitor_findings_count,
        normal = stored.data.analysis.normal_findings_count,
        "Re-salvaged stored analysis"
    );

    Ok(Some(stored.data.analysis))
}
