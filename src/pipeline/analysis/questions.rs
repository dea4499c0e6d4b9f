use serde::Deserialize;

use super::framing::strip_framing;
use crate::models::{Question, QuestionPriority, DEFAULT_QUESTION_CATEGORY};

/// Upper bound on questions recovered from free prose.
pub const MAX_FALLBACK_QUESTIONS: usize = 5;

/// Lines shorter than this are headings or fragments, not questions.
const MIN_QUESTION_CHARS: usize = 20;

const URGENT_KEYWORDS: &[&str] = &["urgent", "critical", "immediate"];
const IMPORTANT_KEYWORDS: &[&str] = &["important", "should", "treatment"];

/// Parse the question generator's output.
///
/// Prefers the `{"questions": [...]}` object. When that does not parse,
/// falls back to picking question-like lines out of the prose.
pub fn parse_questions_response(raw: &str) -> Vec<Question> {
    #[derive(Deserialize)]
    struct RawQuestions {
        #[serde(default)]
        questions: Vec<serde_json::Value>,
    }

    match serde_json::from_str::<RawQuestions>(strip_framing(raw)) {
        Ok(parsed) => {
            let questions: Vec<Question> = parsed
                .questions
                .into_iter()
                .filter_map(|v| serde_json::from_value::<Question>(v).ok())
                .map(|mut q| {
                    q.question = clean_question_text(&q.question);
                    q
                })
                .filter(|q| !q.question.is_empty())
                .collect();
            tracing::info!(count = questions.len(), "Parsed questions JSON");
            questions
        }
        Err(e) => {
            tracing::warn!(error = %e, "Questions JSON did not parse, scanning prose");
            questions_from_prose(raw)
        }
    }
}

/// Remove key fragments the model sometimes echoes into the value.
fn clean_question_text(text: &str) -> String {
    text.replace("\"question\": \"", "")
        .trim_matches('"')
        .replace("\",", "")
        .trim()
        .to_string()
}

fn questions_from_prose(raw: &str) -> Vec<Question> {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.contains('?') && line.chars().count() > MIN_QUESTION_CHARS)
        .take(MAX_FALLBACK_QUESTIONS)
        .map(|line| Question {
            priority: priority_from_keywords(line),
            question: line
                .trim_start_matches(|c: char| c.is_ascii_digit() || ".-) ".contains(c))
                .to_string(),
            category: DEFAULT_QUESTION_CATEGORY.to_string(),
        })
        .collect()
}

fn priority_from_keywords(line: &str) -> QuestionPriority {
    let lower = line.to_lowercase();
    if URGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        QuestionPriority::Urgent
    } else if IMPORTANT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        QuestionPriority::Important
    } else {
        QuestionPriority::Followup
    }
}
