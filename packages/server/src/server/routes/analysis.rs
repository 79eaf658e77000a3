//! Stand-alone pattern detection and claim extraction.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use verification::{Claim, HallucinationReport};

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub citation: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractClaimsRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractClaimsResponse {
    pub claims: Vec<Claim>,
    pub total_claims: usize,
    pub factual_claims: usize,
    pub text_length: usize,
}

/// POST /api/detect-hallucinations
pub async fn detect_hallucinations_handler(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult<Json<HallucinationReport>> {
    let Json(request) = payload?;
    if request.citation.trim().is_empty() {
        return Err(ApiError::BadRequest("citation must not be empty".into()));
    }

    let report = state
        .verifier
        .detector()
        .detect(&request.citation, request.context.as_deref());
    Ok(Json(report))
}

/// POST /api/extract-claims
pub async fn extract_claims_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExtractClaimsRequest>, JsonRejection>,
) -> ApiResult<Json<ExtractClaimsResponse>> {
    let Json(request) = payload?;
    let claims = state.verifier.claim_extractor().extract(&request.text);

    Ok(Json(ExtractClaimsResponse {
        total_claims: claims.len(),
        factual_claims: claims.iter().filter(|c| c.needs_verification).count(),
        text_length: request.text.chars().count(),
        claims,
    }))
}
