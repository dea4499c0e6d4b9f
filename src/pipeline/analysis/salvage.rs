use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::{Finding, FindingStatus};

/// Bytes after a matched finding head searched for its optional fields.
const TRAILING_WINDOW: usize = 500;

/// The five mandatory fields, in order, each with a closed string value.
static FINDING_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*"test_name":\s*"([^"]+)"[^}]*"value":\s*"([^"]*)"[^}]*"normal_range":\s*"([^"]*)"[^}]*"status":\s*"([^"]*)"[^}]*"plain_english":\s*"([^"]*)""#,
    )
    .unwrap()
});

static WHAT_IT_MEANS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""what_it_means":\s*"([^"]*)""#).unwrap());

static CLINICAL_SIGNIFICANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""clinical_significance":\s*"([^"]*)""#).unwrap());

static RECOMMENDATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""recommendations":\s*\[(.*?)\]"#).unwrap());

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// A fully closed eight-field record, fields in canonical order.
static COMPLETE_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\{\s*"test_name":\s*"([^"]+)",\s*"value":\s*"([^"]*)",\s*"normal_range":\s*"([^"]*)",\s*"status":\s*"([^"]*)",\s*"plain_english":\s*"([^"]*)",\s*"what_it_means":\s*"([^"]*)",\s*"clinical_significance":\s*"([^"]*)",\s*"recommendations":\s*\[(.*?)\]\s*\}"#,
    )
    .unwrap()
});

/// Recover findings from text that is not valid JSON.
///
/// Every match of the five mandatory fields yields one finding; the optional
/// fields are looked up in a short window after the match. Values must have
/// their closing quote, so a record cut off mid-string is never returned.
pub fn salvage_findings(text: &str) -> Vec<Finding> {
    FINDING_HEAD
        .captures_iter(text)
        .map(|caps| {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let window = &text[whole.start..window_end(text, whole.end + TRAILING_WINDOW)];

            Finding {
                test_name: group(&caps, 1),
                value: group(&caps, 2),
                normal_range: group(&caps, 3),
                status: FindingStatus::from_model_label(&group(&caps, 4)),
                plain_english: group(&caps, 5),
                what_it_means: first_group(&WHAT_IT_MEANS, window),
                clinical_significance: first_group(&CLINICAL_SIGNIFICANCE, window),
                recommendations: RECOMMENDATIONS
                    .captures(window)
                    .and_then(|c| c.get(1))
                    .map(|m| quoted_items(m.as_str()))
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// Stricter pass used when re-processing stored analyses: only records with
/// all eight fields present, in order, and closed by `}` are accepted.
pub fn salvage_complete_records(text: &str) -> Vec<Finding> {
    COMPLETE_RECORD
        .captures_iter(text)
        .map(|caps| Finding {
            test_name: group(&caps, 1),
            value: group(&caps, 2),
            normal_range: group(&caps, 3),
            status: FindingStatus::from_model_label(&group(&caps, 4)),
            plain_english: group(&caps, 5),
            what_it_means: Some(group(&caps, 6)),
            clinical_significance: Some(group(&caps, 7)),
            recommendations: quoted_items(&group(&caps, 8)),
        })
        .collect()
}

fn group(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn first_group(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn quoted_items(list: &str) -> Vec<String> {
    QUOTED
        .captures_iter(list)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Clamp `end` to the text length and back off to a char boundary.
fn window_end(text: &str, end: usize) -> usize {
    let mut end = end.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_AND_A_HALF: &str = r#"{"overall_summary": "Mostly fine", "findings": [
        {"test_name": "WBC", "value": "6.1 K/uL", "normal_range": "4.0-11.0", "status": "NORMAL",
         "plain_english": "Normal white cells.", "what_it_means": "Infection fighters.",
         "clinical_significance": "No concern.", "recommendations": ["None needed", "Recheck yearly"]},
        {"test_name": "Hemoglobin", "value": "11.2 g/dL", "normal_range": "12.0-16.0", "status": "urgent",
         "plain_english": "A bit low."},
        {"test_name": "Platelets", "value": "250", "normal_range": "150-400", "status": "NORMAL",
         "plain_english": "Platelets are in the nor"#;

    #[test]
    fn no_matches_yields_empty() {
        assert!(salvage_findings("the model said nothing useful").is_empty());
        assert!(salvage_findings("").is_empty());
    }

    #[test]
    fn recovers_closed_records_and_drops_cut_one() {
        let findings = salvage_findings(TWO_AND_A_HALF);
        assert_eq!(findings.len(), 2);

        let wbc = &findings[0];
        assert_eq!(wbc.test_name, "WBC");
        assert_eq!(wbc.value, "6.1 K/uL");
        assert_eq!(wbc.status, FindingStatus::Normal);
        assert_eq!(wbc.what_it_means.as_deref(), Some("Infection fighters."));
        assert_eq!(wbc.clinical_significance.as_deref(), Some("No concern."));
        assert_eq!(wbc.recommendations, vec!["None needed", "Recheck yearly"]);

        assert_eq!(findings[1].test_name, "Hemoglobin");
        assert_eq!(findings[1].status, FindingStatus::Urgent);
    }

    #[test]
    fn missing_optional_fields_stay_empty() {
        let findings = salvage_findings(TWO_AND_A_HALF);
        assert_eq!(findings[1].what_it_means, None);
    }

    #[test]
    fn unknown_status_becomes_monitor() {
        let text = r#"{"test_name": "LDL", "value": "130", "normal_range": "<100", "status": "borderline", "plain_english": "Slightly high."}"#;
        let findings = salvage_findings(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, FindingStatus::Monitor);
    }

    #[test]
    fn window_respects_multibyte_text() {
        let mut text = String::from(
            r#"{"test_name": "B12", "value": "210", "normal_range": "200-900", "status": "URGENT", "plain_english": "Low.""#,
        );
        text.push(' ');
        text.push_str(&"µ".repeat(400));
        let findings = salvage_findings(&text);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].recommendations.is_empty());
    }

    #[test]
    fn complete_records_require_all_eight_fields() {
        let text = r#"[
            {"test_name": "TSH", "value": "2.1", "normal_range": "0.4-4.0", "status": "NORMAL",
             "plain_english": "Thyroid fine.", "what_it_means": "Thyroid signal.",
             "clinical_significance": "None.", "recommendations": ["Nothing"]},
            {"test_name": "T4", "value": "1.1", "normal_range": "0.8-1.8", "status": "NORMAL",
             "plain_english": "Fine."}
        ]"#;
        let findings = salvage_complete_records(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].test_name, "TSH");
        assert_eq!(findings[0].recommendations, vec!["Nothing"]);
    }
}
