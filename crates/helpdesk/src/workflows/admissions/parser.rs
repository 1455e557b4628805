use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Fields recovered from a noisy OCR transcript. Either may be absent and
/// neither is checked for being a well-formed grade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResult {
    pub result: Option<String>,
    pub overall_grade: Option<String>,
}

impl ParsedResult {
    /// Line-oriented rendering understood by the shortlisting agent.
    pub fn as_document_text(&self) -> Option<String> {
        let grade = self.overall_grade.as_deref()?;
        let result = self.result.as_deref().unwrap_or("None");
        Some(format!("Result: {result}\nOverall Grade: {grade}"))
    }
}

fn grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Grade\s+([A-Z+]+)").expect("grade pattern compiles"))
}

fn pass_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"PASS\s+\d+\s+([A-Z+]+)").expect("pass pattern compiles"))
}

pub fn parse_extracted_text(text: &str) -> ParsedResult {
    let capture = |pattern: &Regex| {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_string())
    };

    ParsedResult {
        result: capture(grade_pattern()),
        overall_grade: capture(pass_pattern()),
    }
}
