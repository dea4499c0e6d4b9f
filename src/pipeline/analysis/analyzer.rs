use super::parser::parse_analysis_response;
use super::prompt::{
    build_analysis_system_prompt, build_analysis_user_prompt, build_classify_prompt,
    build_questions_user_prompt, build_summary_prompt, CLASSIFY_SYSTEM_PROMPT,
    QUESTIONS_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT,
};
use super::questions::parse_questions_response;
use super::types::{ChatMessage, LlmClient};
use super::AnalysisError;
use crate::models::{AnalysisResult, Finding, Question};

const CLASSIFY_TEMPERATURE: f32 = 0.1;
/// Deterministic output keeps repeated analyses of one document comparable.
const ANALYZE_TEMPERATURE: f32 = 0.0;
const QUESTIONS_TEMPERATURE: f32 = 0.3;
const SUMMARY_TEMPERATURE: f32 = 0.4;

/// The model-facing steps of a document analysis. Each call is one
/// chat completion; output is handed to the tolerant parsers.
pub struct MedicalAnalyzer {
    client: Box<dyn LlmClient + Send + Sync>,
}

impl MedicalAnalyzer {
    pub fn new(client: Box<dyn LlmClient + Send + Sync>) -> Self {
        Self { client }
    }

    /// Document category, e.g. "Lab Results". Free text from the model, trimmed.
    pub fn classify_document(&self, text: &str) -> Result<String, AnalysisError> {
        let reply = self.client.complete(
            &[
                ChatMessage::system(CLASSIFY_SYSTEM_PROMPT),
                ChatMessage::user(build_classify_prompt(text)),
            ],
            CLASSIFY_TEMPERATURE,
        )?;
        let category = reply.trim().to_string();
        tracing::info!(category = %category, "Document classified");
        Ok(category)
    }

    pub fn analyze_document(
        &self,
        text: &str,
        document_type: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let reply = self.client.complete(
            &[
                ChatMessage::system(build_analysis_system_prompt(document_type)),
                ChatMessage::user(build_analysis_user_prompt(text)),
            ],
            ANALYZE_TEMPERATURE,
        )?;
        tracing::debug!(chars = reply.len(), "Received analysis response");
        Ok(parse_analysis_response(&reply))
    }

    pub fn generate_questions(
        &self,
        findings: &[Finding],
        document_type: &str,
    ) -> Result<Vec<Question>, AnalysisError> {
        let reply = self.client.complete(
            &[
                ChatMessage::system(QUESTIONS_SYSTEM_PROMPT),
                ChatMessage::user(build_questions_user_prompt(findings, document_type)),
            ],
            QUESTIONS_TEMPERATURE,
        )?;
        Ok(parse_questions_response(&reply))
    }

    /// Short patient-facing summary of the document head.
    pub fn generate_summary(&self, text: &str) -> Result<String, AnalysisError> {
        let reply = self.client.complete(
            &[
                ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user(build_summary_prompt(text)),
            ],
            SUMMARY_TEMPERATURE,
        )?;
        Ok(reply.trim().to_string())
    }
}
