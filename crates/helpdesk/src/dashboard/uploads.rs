use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::Path;
use tempfile::NamedTempFile;

/// Accepted by the document verification page.
pub const VERIFICATION_EXTENSIONS: [&str; 5] = ["pdf", "docx", "jpg", "png", "jpeg"];
/// Accepted by the shortlisting page; OCR needs an image.
pub const RESULT_SHEET_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file was uploaded")]
    Missing,
    #[error("unsupported file type `{extension}`; expected one of: {allowed}")]
    UnsupportedType { extension: String, allowed: String },
    #[error("failed to read upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            UploadError::Missing => StatusCode::BAD_REQUEST,
            UploadError::Multipart(err) => err.status(),
            UploadError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// First file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, UploadError> {
        while let Some(field) = multipart.next_field().await? {
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            let bytes = field.bytes().await?;
            return Ok(Self {
                file_name,
                bytes: bytes.to_vec(),
            });
        }
        Err(UploadError::Missing)
    }

    /// Lower-cased extension, empty when the name has none.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    pub fn ensure_extension(&self, allowed: &[&str]) -> Result<(), UploadError> {
        let extension = self.extension();
        if allowed.contains(&extension.as_str()) {
            Ok(())
        } else {
            Err(UploadError::UnsupportedType {
                extension,
                allowed: allowed.join(", "),
            })
        }
    }

    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Write to a uniquely named temp file that is deleted when the guard drops.
    pub async fn stage(&self) -> Result<NamedTempFile, UploadError> {
        let suffix = format!(".{}", self.extension());
        let staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile()?;
        tokio::fs::write(staged.path(), &self.bytes).await?;
        Ok(staged)
    }
}
