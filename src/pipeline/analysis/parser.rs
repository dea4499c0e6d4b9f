use serde::Deserialize;

use super::framing::strip_framing;
use super::salvage::salvage_findings;
use crate::models::{AnalysisResult, Finding, FindingStatus, RecoveryTier};

pub const SALVAGE_SUMMARY: &str = "Analysis completed but formatting issue occurred.";
pub const SALVAGE_ERROR: &str = "JSON parse error - recovered findings";

/// Parse raw model output into an `AnalysisResult`. Never fails.
///
/// Strict JSON first, then brace repair for truncated output, then regex
/// salvage of individual finding records. The tier that succeeded is
/// recorded in `recovery_tier`, and counts are always recomputed.
pub fn parse_analysis_response(raw: &str) -> AnalysisResult {
    let framed = strip_framing(raw);

    let parsed = parse_object(framed)
        .map(|r| (r, RecoveryTier::Strict))
        .or_else(|| {
            let repaired = repair_truncated_json(framed)?;
            tracing::info!(
                original_len = framed.len(),
                repaired_len = repaired.len(),
                "Repaired truncated analysis JSON"
            );
            parse_object(&repaired).map(|r| (r, RecoveryTier::Repaired))
        });

    let result = match parsed {
        Some((raw_analysis, tier)) => raw_analysis.into_result(tier),
        None => salvage(raw),
    };

    tracing::info!(
        tier = result.recovery_tier.as_str(),
        findings = result.findings.len(),
        urgent = result.urgent_findings_count,
        monitor = result.monitor_findings_count,
        normal = result.normal_findings_count,
        "Parsed analysis response"
    );

    result
}

/// Close a JSON object that was cut off before its closing braces.
///
/// Returns `None` when braces already balance. When a `"findings"` array is
/// open, trailing whitespace and commas are dropped and `]` appended first.
/// One `}` is added per missing brace, so the result may still be invalid
/// if the cut fell inside a nested record; the caller falls through to
/// salvage in that case.
pub fn repair_truncated_json(text: &str) -> Option<String> {
    let opens = text.matches('{').count();
    let closes = text.matches('}').count();
    if opens <= closes {
        return None;
    }

    let mut repaired = text.to_string();
    if text.contains("\"findings\"") && !text.trim_end().ends_with("]}") {
        repaired = text.trim_end().trim_end_matches(',').to_string();
        repaired.push(']');
    }
    repaired.push_str(&"}".repeat(opens - closes));
    Some(repaired)
}

/// Top-level shape, with findings kept raw for per-item parsing.
#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    overall_summary: Option<serde_json::Value>,
    #[serde(default)]
    overall_status: Option<String>,
    #[serde(default)]
    findings: Option<Vec<serde_json::Value>>,
}

impl RawAnalysis {
    fn into_result(self, tier: RecoveryTier) -> AnalysisResult {
        let summary = match self.overall_summary {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let status = self
            .overall_status
            .as_deref()
            .map(FindingStatus::from_model_label)
            .unwrap_or(FindingStatus::Monitor);

        AnalysisResult::new(
            summary,
            status,
            parse_array_lenient(self.findings.as_deref()),
            tier,
        )
    }
}

fn parse_object(text: &str) -> Option<RawAnalysis> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value(value).ok(),
        Ok(_) => {
            tracing::warn!("Analysis JSON is not an object");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Analysis JSON did not parse");
            None
        }
    }
}

/// Parse a JSON array leniently, skipping items that fail to deserialize.
fn parse_array_lenient(items: Option<&[serde_json::Value]>) -> Vec<Finding> {
    match items {
        Some(arr) => arr
            .iter()
            .filter_map(|v| match serde_json::from_value(v.clone()) {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed finding");
                    None
                }
            })
            .collect(),
        None => vec![],
    }
}

fn salvage(raw: &str) -> AnalysisResult {
    let findings = salvage_findings(raw);
    tracing::warn!(
        recovered = findings.len(),
        "Analysis JSON unrecoverable, salvaged findings by pattern"
    );

    let mut result = AnalysisResult::new(
        SALVAGE_SUMMARY.to_string(),
        FindingStatus::Monitor,
        findings,
        RecoveryTier::Salvaged,
    );
    result.raw_response = Some(raw.to_string());
    result.error = Some(SALVAGE_ERROR.to_string());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding_json(name: &str, status: &str) -> String {
        format!(
            r#"{{"test_name": "{name}", "value": "1.0", "normal_range": "0-2", "status": "{status}",
                "plain_english": "Text.", "what_it_means": "Meaning.",
                "clinical_significance": "Low.", "recommendations": ["Recheck"]}}"#
        )
    }

    #[test]
    fn strict_parse_of_clean_object() {
        let raw = r#"{"overall_summary": "All good", "overall_status": "NORMAL",
            "findings": [{"test_name": "WBC", "value": "6.1 K/uL", "normal_range": "4.0-11.0",
            "status": "NORMAL", "plain_english": "Normal."}],
            "urgent_findings_count": 0, "monitor_findings_count": 0, "normal_findings_count": 1}"#;

        let result = parse_analysis_response(raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Strict);
        assert_eq!(result.overall_summary, "All good");
        assert_eq!(result.overall_status, FindingStatus::Normal);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].test_name, "WBC");
        assert_eq!(result.normal_findings_count, 1);
        assert!(result.error.is_none());
        assert!(result.raw_response.is_none());
    }

    #[test]
    fn model_counts_are_overwritten() {
        let raw = format!(
            r#"{{"overall_summary": "s", "overall_status": "URGENT", "findings": [{}, {}],
                "urgent_findings_count": 7, "monitor_findings_count": 3, "normal_findings_count": 0}}"#,
            finding_json("A", "URGENT"),
            finding_json("B", "NORMAL")
        );
        let result = parse_analysis_response(&raw);
        assert_eq!(result.urgent_findings_count, 1);
        assert_eq!(result.monitor_findings_count, 0);
        assert_eq!(result.normal_findings_count, 1);
    }

    #[test]
    fn fenced_output_with_preamble() {
        let raw = format!(
            "Here is the analysis:\n```json\n{{\"overall_summary\": \"s\", \"overall_status\": \"MONITOR\", \"findings\": [{}]}}\n```\nLet me know!",
            finding_json("LDL", "MONITOR")
        );
        let result = parse_analysis_response(&raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Strict);
        assert_eq!(result.monitor_findings_count, 1);
    }

    #[test]
    fn fourth_finding_cut_mid_record_salvages_first_three() {
        let raw = format!(
            r#"{{"overall_summary": "s", "overall_status": "MONITOR", "findings": [{}, {}, {}, {{"test_name": "D", "value": "2.0", "normal_range": "0-1", "status": "URGENT""#,
            finding_json("A", "NORMAL"),
            finding_json("B", "MONITOR"),
            finding_json("C", "URGENT")
        );
        let result = parse_analysis_response(&raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Salvaged);
        let names: Vec<_> = result.findings.iter().map(|f| f.test_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(result
            .findings
            .iter()
            .all(|f| !f.value.is_empty() && !f.plain_english.is_empty()));
        assert_eq!(result.total_counted(), 3);
        assert_eq!(result.error.as_deref(), Some(SALVAGE_ERROR));
    }

    #[test]
    fn truncation_after_closed_record_is_repaired() {
        let record = |name: &str, status: &str| {
            format!(
                r#"{{"test_name": "{name}", "value": "1.0", "normal_range": "0-2", "status": "{status}", "plain_english": "Text."}}"#
            )
        };
        let raw = format!(
            r#"{{"overall_summary": "s", "overall_status": "MONITOR", "findings": [{}, {}, {}, {{"test_name": "D", "value": "2"#,
            record("A", "NORMAL"),
            record("B", "MONITOR"),
            record("C", "URGENT")
        );
        let result = parse_analysis_response(&raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Repaired);
        let names: Vec<_> = result.findings.iter().map(|f| f.test_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(result.overall_summary, "s");
        assert_eq!(result.urgent_findings_count, 1);
        assert!(result.error.is_none());
    }

    #[test]
    fn unfenced_preamble_parses_strictly() {
        let raw = r#"Here is the result: {"overall_summary":"ok","overall_status":"URGENT","findings":[{"test_name":"B12","value":"150 pg/mL","normal_range":"200-900","status":"URGENT","plain_english":"Low."}]}"#;
        let result = parse_analysis_response(raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Strict);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].status, FindingStatus::Urgent);
        assert_eq!(result.urgent_findings_count, 1);
    }

    #[test]
    fn unrepairable_output_is_salvaged() {
        let raw = format!(
            r#"{{"overall_summary": "s, "findings": [{}, {{"test_name": "B", "value": "unterminated"#,
            finding_json("A", "urgent")
        );
        let result = parse_analysis_response(&raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Salvaged);
        assert_eq!(result.overall_status, FindingStatus::Monitor);
        assert_eq!(result.overall_summary, SALVAGE_SUMMARY);
        assert_eq!(result.error.as_deref(), Some(SALVAGE_ERROR));
        assert_eq!(result.raw_response.as_deref(), Some(raw.as_str()));
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.urgent_findings_count, 1);
    }

    #[test]
    fn empty_input_yields_flagged_empty_result() {
        let result = parse_analysis_response("   ");
        assert!(result.findings.is_empty());
        assert_eq!(result.overall_status, FindingStatus::Monitor);
        assert_eq!(result.recovery_tier, RecoveryTier::Salvaged);
        assert!(result.error.is_some());
    }

    #[test]
    fn non_object_json_falls_through_to_salvage() {
        let result = parse_analysis_response("[1, 2, 3]");
        assert_eq!(result.recovery_tier, RecoveryTier::Salvaged);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn malformed_finding_skipped_not_fatal() {
        let raw = format!(
            r#"{{"overall_summary": "s", "overall_status": "NORMAL", "findings": [{}, {{"value": "no name"}}]}}"#,
            finding_json("A", "NORMAL")
        );
        let result = parse_analysis_response(&raw);
        assert_eq!(result.recovery_tier, RecoveryTier::Strict);
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn repair_leaves_balanced_text_alone() {
        assert!(repair_truncated_json(r#"{"a": 1}"#).is_none());
    }

    #[test]
    fn repair_closes_open_findings_array() {
        let repaired = repair_truncated_json(r#"{"findings": [{"a": 1}, "#).unwrap();
        assert_eq!(repaired, r#"{"findings": [{"a": 1}]}"#);
    }
}
