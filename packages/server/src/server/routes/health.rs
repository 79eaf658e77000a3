use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    timestamp: String,
    cache: CacheHealth,
    ai_providers: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct CacheHealth {
    backend: &'static str,
    enabled: bool,
}

/// Health check endpoint
///
/// Reports the cache backend and the configured AI providers. The service
/// has no hard dependencies, so it is healthy whenever it answers.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = state.verifier.cache();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        cache: CacheHealth {
            backend: cache.backend(),
            enabled: cache.is_enabled(),
        },
        ai_providers: state.verifier.ai_providers(),
    })
}
