//! Citation verification endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use verification::{
    BatchVerificationResult, Citation, Priority, TextFormat, TextVerificationResult,
    VerificationOptions, VerificationResult,
};

use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct VerifyCitationRequest {
    pub citation: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub options: VerificationOptions,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTextRequest {
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    #[serde(default)]
    pub options: VerificationOptions,
}

/// A batch entry: either a bare citation string or `{text, context?}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchCitation {
    Text(String),
    WithContext {
        text: String,
        #[serde(default)]
        context: Option<String>,
    },
}

impl From<BatchCitation> for Citation {
    fn from(entry: BatchCitation) -> Self {
        match entry {
            BatchCitation::Text(text) => Citation::new(text),
            BatchCitation::WithContext {
                text,
                context: Some(context),
            } => Citation::new(text).with_context(context),
            BatchCitation::WithContext { text, context: None } => Citation::new(text),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchVerifyRequest {
    pub citations: Vec<BatchCitation>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub options: VerificationOptions,
}

/// POST /api/verify-citation
pub async fn verify_citation_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerifyCitationRequest>, JsonRejection>,
) -> ApiResult<Json<VerificationResult>> {
    let Json(request) = payload?;
    let citation = match request.context {
        Some(context) => Citation::new(request.citation).with_context(context),
        None => Citation::new(request.citation),
    };

    let result = state.verifier.verify(&citation, &request.options).await?;
    Ok(Json(result))
}

/// POST /api/verify-text
pub async fn verify_text_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerifyTextRequest>, JsonRejection>,
) -> ApiResult<Json<TextVerificationResult>> {
    let Json(request) = payload?;
    let result = state
        .verifier
        .verify_text(&request.text, request.format, &request.options)
        .await?;
    Ok(Json(result))
}

/// POST /api/batch-verify
///
/// More than 100 citations is rejected with 400 before any work starts.
pub async fn batch_verify_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchVerifyRequest>, JsonRejection>,
) -> ApiResult<Json<BatchVerificationResult>> {
    let Json(request) = payload?;
    let citations: Vec<Citation> = request.citations.into_iter().map(Citation::from).collect();

    tracing::info!(
        count = citations.len(),
        priority = ?request.priority,
        "batch verification requested"
    );
    let result = state
        .verifier
        .verify_batch(&citations, request.priority, &request.options)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_entries_accept_strings_and_objects() {
        let request: BatchVerifyRequest = serde_json::from_str(
            r#"{"citations": ["Smith (2019). A paper.", {"text": "Lee (2018). B.", "context": "Lee found it."}]}"#,
        )
        .unwrap();
        let citations: Vec<Citation> = request.citations.into_iter().map(Citation::from).collect();

        assert_eq!(citations[0].text, "Smith (2019). A paper.");
        assert!(citations[0].context.is_none());
        assert_eq!(citations[1].context.as_deref(), Some("Lee found it."));
        assert_eq!(request.priority, Priority::Balanced);
    }
}
