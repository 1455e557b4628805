//! OCR capability used by the document agents.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::error::FailureKind;

/// Reads the text out of a scanned document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to launch OCR engine '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("OCR engine exited with {status}: {stderr}")]
    Engine { status: String, stderr: String },
}

impl ExtractionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractionError::NotFound(_) => FailureKind::FileNotFound,
            ExtractionError::Launch { .. } | ExtractionError::Engine { .. } => {
                FailureKind::ExternalService
            }
        }
    }
}

/// Runs the `tesseract` binary and captures stdout.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    command: String,
}

impl TesseractExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::NotFound(path.to_path_buf()));
        }

        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .output()
            .await
            .map_err(|source| ExtractionError::Launch {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Engine {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(path = %path.display(), chars = text.len(), "ocr extraction finished");
        Ok(text)
    }
}
