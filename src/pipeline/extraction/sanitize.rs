/// Normalize extracted text before it goes downstream.
///
/// Control characters are dropped, runs of whitespace inside a line collapse
/// to one space, blank lines disappear, and the surviving lines are joined
/// with a single `\n`. Line structure is kept because the analysis prompt
/// relies on one-result-per-line layouts.
pub fn clean_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            line.split(|c: char| c.is_whitespace())
                .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when a strategy produced nothing worth keeping.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
