use crate::models::Finding;

/// Classification looks only at the head of the document.
pub const CLASSIFY_CHAR_LIMIT: usize = 1000;
pub const SUMMARY_CHAR_LIMIT: usize = 2000;

pub const DOCUMENT_CATEGORIES: &[&str] = &[
    "Lab Results",
    "Imaging Report",
    "Pathology Report",
    "Discharge Summary",
    "Doctor's Notes",
    "Other",
];

pub const CLASSIFY_SYSTEM_PROMPT: &str = "You classify medical documents. \
Answer with exactly one of: Lab Results, Imaging Report, Pathology Report, \
Discharge Summary, Doctor's Notes, Other. Reply with the category name only.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You explain medical documents to patients. \
Write a short summary (3-4 sentences) in plain language at an 8th grade reading level. \
Mention the most important results and whether anything needs attention. \
Do not give a diagnosis.";

pub const QUESTIONS_SYSTEM_PROMPT: &str = r#"You help a patient prepare questions for their doctor about THEIR OWN test results.

REQUIREMENTS:
1. Write 3 to 5 questions.
2. Every question names a real test from the results and quotes its value.
3. Abnormal results (URGENT, then MONITOR) come before normal ones.
4. Keep each question conversational and actionable: treatment, lifestyle, medication, follow-up testing, causes.

Example, for Vitamin D 18 ng/mL with range 30-50:
"My Vitamin D is 18 ng/mL, below the 30-50 range. What supplement dose should I take to bring it back up?"

Priority levels:
- URGENT: results needing prompt attention
- IMPORTANT: borderline or values to monitor
- FOLLOWUP: normal results or general wellness

Categories: Treatment, Lifestyle, Medication, Testing, Prevention, General

Reply with JSON only, no markdown and no preamble:
{
  "questions": [
    {"priority": "URGENT", "question": "...", "category": "Treatment"}
  ]
}"#;

/// Truncate to at most `limit` characters without splitting a code point.
pub fn head_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn build_classify_prompt(text: &str) -> String {
    format!(
        "Classify this medical document:\n\n{}",
        head_chars(text, CLASSIFY_CHAR_LIMIT)
    )
}

pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "Summarize this medical document for the patient:\n\n{}",
        head_chars(text, SUMMARY_CHAR_LIMIT)
    )
}

/// System prompt for the structured interpretation pass.
pub fn build_analysis_system_prompt(document_type: &str) -> String {
    format!(
        r#"You translate medical records into plain language for patients.

DOCUMENT TYPE: {document_type}

METHOD:
1. Read the whole document.
2. Find every line holding a test result (name, value, reference range).
3. Count the tests first, then emit exactly one finding per test, in document order. Never skip or merge tests.

STATUS RULES:
- URGENT: value outside the reference range, or within 5-10% of a limit.
- MONITOR: inside the range but within 10-20% of a limit, or otherwise suboptimal.
- NORMAL: comfortably inside the range, at least 20% away from both limits.
When unsure between NORMAL and MONITOR, choose MONITOR.

FOR EACH TEST:
- plain_english: 1-2 short sentences at an 8th grade reading level.
- what_it_means: what the test measures.
- clinical_significance: one sentence.
- recommendations: a few short action items.

Reply with valid JSON only. No markdown, no preamble, no trailing text.
{{
  "overall_summary": "2-3 sentence summary",
  "overall_status": "NORMAL|MONITOR|URGENT",
  "findings": [
    {{
      "test_name": "Vitamin B12",
      "value": "210 pg/mL",
      "normal_range": "200-900 pg/mL",
      "status": "URGENT",
      "plain_english": "Your B12 is at the very bottom of the normal range.",
      "what_it_means": "B12 helps make red blood cells and keeps nerves healthy.",
      "clinical_significance": "Levels this low can cause fatigue and nerve symptoms.",
      "recommendations": ["Ask about B12 supplements", "Retest in 3 months"]
    }}
  ],
  "urgent_findings_count": 1,
  "monitor_findings_count": 0,
  "normal_findings_count": 0
}}"#
    )
}

pub fn build_analysis_user_prompt(text: &str) -> String {
    format!("Analyze this document and reply with valid JSON only:\n\n{text}")
}

/// List findings with their actual values so the questions can cite them.
pub fn build_questions_user_prompt(findings: &[Finding], document_type: &str) -> String {
    let details = findings
        .iter()
        .map(|f| {
            format!(
                "• {}: {} (Normal: {}) - Status: {}\n  Meaning: {}",
                f.test_name,
                or_na(&f.value),
                or_na(&f.normal_range),
                f.status.as_str(),
                f.plain_english
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Document Type: {document_type}\n\nTest Results:\n{details}\n\n\
         Write questions about THESE values. Reply with valid JSON only:"
    )
}

fn or_na(s: &str) -> &str {
    if s.trim().is_empty() {
        "N/A"
    } else {
        s
    }
}
