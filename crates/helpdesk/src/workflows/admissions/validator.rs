use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::FailureKind;
use crate::ocr::{ExtractionError, TextExtractor};

/// Keywords every scanned result sheet must mention.
pub const RESULT_SHEET_KEYWORDS: [&str; 5] =
    ["Name", "Registration No", "Overall Grade", "Result", "Roll No"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Error,
    Failed,
    Verified,
}

/// Outcome of checking one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl ValidationResult {
    pub fn verified() -> Self {
        Self {
            status: ValidationStatus::Verified,
            message: "Document is valid.".to_string(),
            kind: None,
            missing: Vec::new(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == ValidationStatus::Verified
    }

    fn from_extraction_error(err: &ExtractionError) -> Self {
        let message = match err {
            ExtractionError::NotFound(_) => "Document not found.".to_string(),
            other => other.to_string(),
        };
        Self {
            status: ValidationStatus::Error,
            message,
            kind: Some(err.kind()),
            missing: Vec::new(),
        }
    }
}

/// Case-insensitive keyword presence check.
pub fn validate_text<S: AsRef<str>>(text: &str, required_keywords: &[S]) -> ValidationResult {
    let haystack = text.to_lowercase();
    let missing: Vec<String> = required_keywords
        .iter()
        .map(AsRef::as_ref)
        .filter(|keyword| !haystack.contains(&keyword.to_lowercase()))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        return ValidationResult::verified();
    }

    ValidationResult {
        status: ValidationStatus::Failed,
        message: format!("Missing data: {}", missing.join(", ")),
        kind: Some(FailureKind::MissingField),
        missing,
    }
}

/// Text and verdict from a single OCR pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInspection {
    pub extracted_text: Option<String>,
    pub validation: ValidationResult,
}

/// Document checking agent: OCR followed by the keyword rule.
#[derive(Clone)]
pub struct DocumentValidator {
    extractor: Arc<dyn TextExtractor>,
}

impl DocumentValidator {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::NotFound(path.to_path_buf()));
        }
        self.extractor.extract_text(path).await
    }

    pub async fn validate_document<S: AsRef<str>>(
        &self,
        path: &Path,
        required_keywords: &[S],
    ) -> ValidationResult {
        self.inspect(path, required_keywords).await.validation
    }

    pub async fn inspect<S: AsRef<str>>(
        &self,
        path: &Path,
        required_keywords: &[S],
    ) -> DocumentInspection {
        match self.extract_text(path).await {
            Ok(text) => {
                let validation = validate_text(&text, required_keywords);
                info!(
                    path = %path.display(),
                    status = ?validation.status,
                    "document validated"
                );
                DocumentInspection {
                    extracted_text: Some(text),
                    validation,
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "document extraction failed");
                DocumentInspection {
                    extracted_text: None,
                    validation: ValidationResult::from_extraction_error(&err),
                }
            }
        }
    }
}
