/// Remove markdown fences and conversational preamble around a JSON object.
///
/// Takes the body of the first ```` ```json ```` fence (or the first bare
/// fence), then narrows to the span between the first `{` and the last `}`.
/// Text without braces is returned trimmed but otherwise untouched.
pub fn strip_framing(raw: &str) -> &str {
    let mut text = raw;

    if let Some((_, rest)) = text.split_once("```json") {
        text = rest.split("```").next().unwrap_or(rest);
    } else if let Some((_, rest)) = text.split_once("```") {
        text = rest.split("```").next().unwrap_or(rest);
    }

    let text = text.trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_untouched() {
        assert_eq!(strip_framing(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn json_fence_removed() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nHope that helps!";
        assert_eq!(strip_framing(raw), "{\"a\": 1}");
    }

    #[test]
    fn plain_fence_removed() {
        let raw = "```\n{\"a\": [1, 2]}\n```";
        assert_eq!(strip_framing(raw), "{\"a\": [1, 2]}");
    }

    #[test]
    fn unclosed_fence_keeps_rest() {
        let raw = "```json\n{\"findings\": [{\"test_name\": \"WBC\"}";
        assert_eq!(strip_framing(raw), "{\"findings\": [{\"test_name\": \"WBC\"}");
    }

    #[test]
    fn preamble_and_trailer_dropped() {
        let raw = "Sure! The analysis is {\"overall_status\": \"NORMAL\"} as requested.";
        assert_eq!(strip_framing(raw), "{\"overall_status\": \"NORMAL\"}");
    }

    #[test]
    fn truncated_object_narrows_to_last_closing_brace() {
        let raw = r#"{"findings": [{"test_name": "A"}, {"test_name": "B"}, {"test_na"#;
        assert_eq!(
            strip_framing(raw),
            r#"{"findings": [{"test_name": "A"}, {"test_name": "B"}"#
        );
    }

    #[test]
    fn no_braces_returns_trimmed_text() {
        assert_eq!(strip_framing("  1. What is next?  "), "1. What is next?");
    }
}
