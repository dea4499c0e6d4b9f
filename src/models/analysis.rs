use serde::{Deserialize, Deserializer, Serialize};

use super::enums::{FindingStatus, QuestionPriority, RecoveryTier};

/// One interpreted test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub test_name: String,
    /// Raw value as printed on the report, units included ("210 pg/mL").
    #[serde(default, deserialize_with = "text_or_number")]
    pub value: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub normal_range: String,
    #[serde(deserialize_with = "lenient_status")]
    pub status: FindingStatus,
    #[serde(default, deserialize_with = "text_or_number")]
    pub plain_english: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what_it_means: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_significance: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Interpreted document. Counts are always derived from `findings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_summary: String,
    pub overall_status: FindingStatus,
    pub findings: Vec<Finding>,
    pub urgent_findings_count: usize,
    pub monitor_findings_count: usize,
    pub normal_findings_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// Recovery error, set only when findings were salvaged from broken output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "strict_tier")]
    pub recovery_tier: RecoveryTier,
}

fn strict_tier() -> RecoveryTier {
    RecoveryTier::Strict
}

impl AnalysisResult {
    pub fn new(
        overall_summary: String,
        overall_status: FindingStatus,
        findings: Vec<Finding>,
        recovery_tier: RecoveryTier,
    ) -> Self {
        let mut result = Self {
            overall_summary,
            overall_status,
            findings,
            urgent_findings_count: 0,
            monitor_findings_count: 0,
            normal_findings_count: 0,
            raw_response: None,
            error: None,
            recovery_tier,
        };
        result.recount();
        result
    }

    /// Overwrite the three counts with a fresh tally of `findings`.
    pub fn recount(&mut self) {
        let tally = |s: FindingStatus| self.findings.iter().filter(|f| f.status == s).count();
        self.urgent_findings_count = tally(FindingStatus::Urgent);
        self.monitor_findings_count = tally(FindingStatus::Monitor);
        self.normal_findings_count = tally(FindingStatus::Normal);
    }

    pub fn total_counted(&self) -> usize {
        self.urgent_findings_count + self.monitor_findings_count + self.normal_findings_count
    }

    pub fn is_recovered(&self) -> bool {
        self.recovery_tier != RecoveryTier::Strict
    }
}

/// A question the patient can bring to their doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default = "followup", deserialize_with = "lenient_priority")]
    pub priority: QuestionPriority,
    pub question: String,
    #[serde(default = "general_category")]
    pub category: String,
}

pub const DEFAULT_QUESTION_CATEGORY: &str = "General";

fn followup() -> QuestionPriority {
    QuestionPriority::Followup
}

fn general_category() -> String {
    DEFAULT_QUESTION_CATEGORY.to_string()
}

/// Models sometimes emit numbers (`"value": 12.5`) or nulls where text is expected.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FindingStatus, D::Error> {
    let label = String::deserialize(deserializer)?;
    Ok(FindingStatus::from_model_label(&label))
}

fn lenient_priority<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<QuestionPriority, D::Error> {
    let label = String::deserialize(deserializer)?;
    Ok(QuestionPriority::from_model_label(&label))
}
