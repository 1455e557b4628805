//! Result-sheet intake: OCR, keyword validation, grade parsing and shortlisting.

mod parser;
mod shortlist;
mod validator;

pub use parser::{parse_extracted_text, ParsedResult};
pub use shortlist::{
    RejectionReason, ShortlistDecision, ShortlistQuery, ShortlistingAgent,
    DEFAULT_ACCEPTED_GRADES,
};
pub use validator::{
    validate_text, DocumentInspection, DocumentValidator, ValidationResult, ValidationStatus,
    RESULT_SHEET_KEYWORDS,
};

use serde::Serialize;
use std::path::Path;

use crate::tools::SHORTLIST_DIRECTIVE;

/// Everything the document checker sees before asking for a shortlist decision.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSheetReview {
    pub extracted_text: Option<String>,
    pub validation: ValidationResult,
    pub parsed: ParsedResult,
}

impl ResultSheetReview {
    pub fn query(&self) -> ShortlistQuery {
        ShortlistQuery {
            verification_result: self.validation.clone(),
            extracted_text: self.parsed.clone(),
        }
    }

    /// Prompt for the agent executor, mirroring what a checker would type.
    pub fn shortlist_prompt(&self) -> String {
        let payload = serde_json::to_string(&self.query()).unwrap_or_else(|_| "{}".to_string());
        format!("{SHORTLIST_DIRECTIVE} {payload}")
    }
}

/// Run one OCR pass over a result sheet and derive validation and parsed fields.
pub async fn review_result_sheet(validator: &DocumentValidator, path: &Path) -> ResultSheetReview {
    let DocumentInspection {
        extracted_text,
        validation,
    } = validator.inspect(path, &RESULT_SHEET_KEYWORDS).await;
    let parsed = extracted_text
        .as_deref()
        .map(parse_extracted_text)
        .unwrap_or_default();

    ResultSheetReview {
        extracted_text,
        validation,
        parsed,
    }
}
