use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

use super::parser::ParsedResult;
use super::validator::ValidationResult;
use crate::error::FailureKind;

pub const DEFAULT_ACCEPTED_GRADES: [&str; 4] = ["B", "B+", "A", "A+"];

/// Why a student was not shortlisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    NoVerificationInfo,
    VerificationFailed(String),
    GradeNotFound,
    GradeNotAccepted(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NoVerificationInfo => write!(f, "No verification info provided."),
            RejectionReason::VerificationFailed(message) => write!(f, "{message}"),
            RejectionReason::GradeNotFound => {
                write!(f, "Grade not found in the extracted text.")
            }
            RejectionReason::GradeNotAccepted(grade) => {
                write!(f, "Grade '{grade}' not accepted.")
            }
        }
    }
}

/// Shortlisting outcome. `Display` renders the tool-facing string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortlistDecision {
    Shortlisted,
    Rejected(RejectionReason),
    Error { kind: FailureKind, message: String },
}

impl ShortlistDecision {
    fn error(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_shortlisted(&self) -> bool {
        matches!(self, ShortlistDecision::Shortlisted)
    }
}

impl fmt::Display for ShortlistDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortlistDecision::Shortlisted => write!(f, "Shortlisted"),
            ShortlistDecision::Rejected(reason) => write!(f, "Rejected: {reason}"),
            ShortlistDecision::Error { message, .. } => write!(f, "Error: {message}"),
        }
    }
}

/// Payload handed to the shortlisting tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistQuery {
    pub verification_result: ValidationResult,
    pub extracted_text: ParsedResult,
}

fn overall_grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Overall Grade\s*[:\-]?\s*(\w+\+?)").expect("overall grade pattern compiles")
    })
}

/// Grade-threshold shortlisting agent.
#[derive(Debug, Clone)]
pub struct ShortlistingAgent {
    accepted_grades: Vec<String>,
}

impl Default for ShortlistingAgent {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPTED_GRADES.iter().map(|grade| grade.to_string()))
    }
}

impl ShortlistingAgent {
    pub fn new<I, S>(accepted_grades: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_grades: accepted_grades.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepted_grades(&self) -> &[String] {
        &self.accepted_grades
    }

    /// Decide from a JSON string. Never fails: malformed input becomes
    /// `ShortlistDecision::Error`.
    pub fn shortlist(&self, input: &str) -> ShortlistDecision {
        match serde_json::from_str::<Value>(input) {
            Ok(data) => self.shortlist_value(&data),
            Err(err) => ShortlistDecision::error(
                FailureKind::MalformedInput,
                format!("invalid input JSON: {err}"),
            ),
        }
    }

    pub fn shortlist_query(&self, query: &ShortlistQuery) -> ShortlistDecision {
        match serde_json::to_value(query) {
            Ok(data) => self.shortlist_value(&data),
            Err(err) => ShortlistDecision::error(FailureKind::MalformedInput, err.to_string()),
        }
    }

    fn shortlist_value(&self, data: &Value) -> ShortlistDecision {
        let Some(fields) = data.as_object() else {
            return ShortlistDecision::error(
                FailureKind::MalformedInput,
                "expected a JSON object",
            );
        };

        let verification = [fields.get("verification_result"), fields.get("verified_document")]
            .into_iter()
            .flatten()
            .find(|value| is_truthy(value));

        let Some(verification) = verification else {
            return ShortlistDecision::Rejected(RejectionReason::NoVerificationInfo);
        };
        let Some(verification) = verification.as_object() else {
            return ShortlistDecision::error(
                FailureKind::MalformedInput,
                "verification result must be an object",
            );
        };

        if verification.get("status").and_then(Value::as_str) != Some("verified") {
            let message = verification
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Document verification failed.");
            return ShortlistDecision::Rejected(RejectionReason::VerificationFailed(
                message.to_string(),
            ));
        }

        let text = match document_text(fields.get("extracted_text")) {
            Ok(text) => text,
            Err(decision) => return decision,
        };

        let lines: Vec<&str> = text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        debug!(?lines, "lines after splitting extracted text");

        let grade = lines
            .iter()
            .find(|line| line.contains("Overall Grade"))
            .and_then(|line| overall_grade_pattern().captures(line))
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_string());

        let Some(grade) = grade else {
            return ShortlistDecision::Rejected(RejectionReason::GradeNotFound);
        };
        debug!(%grade, "extracted grade");

        if self.accepted_grades.iter().any(|accepted| *accepted == grade) {
            ShortlistDecision::Shortlisted
        } else {
            ShortlistDecision::Rejected(RejectionReason::GradeNotAccepted(grade))
        }
    }
}

fn document_text(value: Option<&Value>) -> Result<String, ShortlistDecision> {
    match value {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Object(fields)) => {
            let parsed: ParsedResult = serde_json::from_value(Value::Object(fields.clone()))
                .map_err(|err| {
                    ShortlistDecision::error(
                        FailureKind::MalformedInput,
                        format!("invalid input JSON: {err}"),
                    )
                })?;
            parsed
                .as_document_text()
                .filter(|_| parsed.overall_grade.as_deref().is_some_and(|g| !g.is_empty()))
                .ok_or_else(|| {
                    ShortlistDecision::error(
                        FailureKind::MissingField,
                        "extracted text has no overall grade",
                    )
                })
        }
        None | Some(Value::Null) => Err(ShortlistDecision::error(
            FailureKind::MissingField,
            "extracted text missing",
        )),
        Some(_) => Err(ShortlistDecision::error(
            FailureKind::MalformedInput,
            "extracted text must be a string or object",
        )),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verified() -> Value {
        json!({ "status": "verified", "message": "Document is valid." })
    }

    #[test]
    fn shortlists_accepted_grade_from_raw_text() {
        let agent = ShortlistingAgent::default();
        let input = json!({
            "verification_result": verified(),
            "extracted_text": "Name: X\nOverall Grade: B+\nResult: PASS",
        });
        assert_eq!(
            agent.shortlist(&input.to_string()),
            ShortlistDecision::Shortlisted
        );
    }

    #[test]
    fn plus_grades_are_matched_exactly() {
        let agent = ShortlistingAgent::new(["B+"]);
        let input = json!({
            "verification_result": verified(),
            "extracted_text": "Overall Grade - B",
        });
        let decision = agent.shortlist(&input.to_string());
        assert_eq!(decision.to_string(), "Rejected: Grade 'B' not accepted.");
    }

    #[test]
    fn rebuilds_text_from_parsed_fields() {
        let agent = ShortlistingAgent::default();
        let input = json!({
            "verified_document": verified(),
            "extracted_text": { "result": "A", "overall_grade": "A+" },
        });
        assert!(agent.shortlist(&input.to_string()).is_shortlisted());
    }

    #[test]
    fn parsed_fields_without_grade_are_an_error() {
        let agent = ShortlistingAgent::default();
        let input = json!({
            "verification_result": verified(),
            "extracted_text": { "result": "A", "overall_grade": null },
        });
        let decision = agent.shortlist(&input.to_string());
        assert!(matches!(
            decision,
            ShortlistDecision::Error {
                kind: FailureKind::MissingField,
                ..
            }
        ));
        assert!(decision.to_string().starts_with("Error: "));
    }

    #[test]
    fn missing_verification_is_rejected() {
        let agent = ShortlistingAgent::default();
        let input = json!({ "verification_result": {}, "extracted_text": "Overall Grade: A" });
        assert_eq!(
            agent.shortlist(&input.to_string()).to_string(),
            "Rejected: No verification info provided."
        );
    }

    #[test]
    fn failed_verification_echoes_message() {
        let agent = ShortlistingAgent::default();
        let input = json!({
            "verification_result": { "status": "failed", "message": "Missing data: Roll No" },
            "extracted_text": "Overall Grade: A",
        });
        assert_eq!(
            agent.shortlist(&input.to_string()).to_string(),
            "Rejected: Missing data: Roll No"
        );

        let input = json!({
            "verification_result": { "status": "error" },
            "extracted_text": "Overall Grade: A",
        });
        assert_eq!(
            agent.shortlist(&input.to_string()).to_string(),
            "Rejected: Document verification failed."
        );
    }

    #[test]
    fn grade_line_without_token_is_not_found() {
        let agent = ShortlistingAgent::default();
        let input = json!({
            "verification_result": verified(),
            "extracted_text": "Result: PASS\nOverall Grade:\nOverall Grade: A",
        });
        assert_eq!(
            agent.shortlist(&input.to_string()),
            ShortlistDecision::Rejected(RejectionReason::GradeNotFound)
        );
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        let agent = ShortlistingAgent::default();
        let decision = agent.shortlist("Shortlist {not json");
        assert!(matches!(
            decision,
            ShortlistDecision::Error {
                kind: FailureKind::MalformedInput,
                ..
            }
        ));
    }

    #[test]
    fn query_round_trips_through_typed_payload() {
        let agent = ShortlistingAgent::default();
        let query = ShortlistQuery {
            verification_result: ValidationResult::verified(),
            extracted_text: ParsedResult {
                result: Some("PASS".to_string()),
                overall_grade: Some("C".to_string()),
            },
        };
        assert_eq!(
            agent.shortlist_query(&query).to_string(),
            "Rejected: Grade 'C' not accepted."
        );
    }
}
