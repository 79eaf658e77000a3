//! Document upload: extract text, then verify the citations in it.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use verification::{TextVerificationResult, VerificationOptions};

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    pub text_length: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document: DocumentSummary,
    pub verification: TextVerificationResult,
}

/// Form flags arrive as strings; anything but "false" is on.
fn flag(value: &str) -> bool {
    !value.trim().eq_ignore_ascii_case("false")
}

/// POST /api/upload-document
///
/// Multipart fields: `file` (required), `enable_ocr`, `enable_ai_analysis`.
pub async fn upload_document_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut enable_ocr = true;
    let mut enable_ai = true;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("enable_ocr") => enable_ocr = flag(&field.text().await?),
            Some("enable_ai_analysis") => enable_ai = flag(&field.text().await?),
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        return Err(ApiError::BadRequest("missing multipart field: file".into()));
    };
    tracing::info!(filename = %filename, size = bytes.len(), "processing uploaded document");

    let document = state.documents.extract(&bytes, &filename, enable_ocr)?;
    if !document.success {
        return Err(ApiError::BadRequest(format!(
            "failed to extract text from document: {}",
            document.error.as_deref().unwrap_or("unknown error")
        )));
    }

    let options = VerificationOptions::default().with_ai_scoring(enable_ai);
    let verification = state
        .verifier
        .verify_text(&document.text, document.format, &options)
        .await?;

    Ok(Json(UploadResponse {
        document: DocumentSummary {
            filename,
            method: document.method,
            pages: document.pages,
            text_length: document.text.chars().count(),
        },
        verification,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_flags() {
        assert!(flag("true"));
        assert!(flag("yes"));
        assert!(!flag("False"));
        assert!(!flag(" false "));
    }
}
