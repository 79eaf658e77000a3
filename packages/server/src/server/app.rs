//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    BoxError, Router,
};
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use verification::{
    ArxivClient, Cache, CitationNetworkSource, ClaimTermEmbedder, CrossrefClient,
    FirecrawlFetcher, GeminiProvider, HttpPageFetcher, MetadataSource, OpenAIEmbedder,
    OpenAIProvider, OpenAlexClient, PageFetcher, PreprintSource, RateLimited, Verifier,
    VerifierConfig,
};

use crate::config::{CacheBackend, Config, EmbeddingProvider};
use crate::documents::DocumentExtractor;
use crate::server::error::ApiError;
use crate::server::routes::{
    batch_verify_handler, detect_hallucinations_handler, extract_claims_handler, health_handler,
    upload_document_handler, verify_citation_handler, verify_text_handler,
};

/// Whole-request ceiling; a batch of 100 with content checks can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub documents: Arc<DocumentExtractor>,
}

impl AppState {
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
            documents: Arc::new(DocumentExtractor::new()),
        }
    }
}

/// Wire the production collaborators described by `config`.
pub fn build_verifier(config: &Config) -> Verifier {
    let verifier_config =
        VerifierConfig::default().with_batch_concurrency(config.batch_concurrency);
    let timeout = verifier_config.timeouts.registry();

    let mut crossref = CrossrefClient::new().with_timeout(timeout);
    let mut openalex = OpenAlexClient::new().with_timeout(timeout);
    if let Some(mailto) = &config.crossref_mailto {
        crossref = crossref.with_mailto(mailto);
        openalex = openalex.with_mailto(mailto.clone());
    }
    let arxiv = ArxivClient::new().with_timeout(timeout);

    let (crossref, arxiv, openalex): (
        Arc<dyn MetadataSource>,
        Arc<dyn PreprintSource>,
        Arc<dyn CitationNetworkSource>,
    ) = match config.registry_rate_limit {
        Some(rps) => (
            Arc::new(RateLimited::new(crossref, rps)),
            Arc::new(RateLimited::new(arxiv, rps)),
            Arc::new(RateLimited::new(openalex, rps)),
        ),
        None => (Arc::new(crossref), Arc::new(arxiv), Arc::new(openalex)),
    };

    let fetcher: Arc<dyn PageFetcher> = match &config.firecrawl_api_key {
        Some(key) => {
            tracing::info!("Using Firecrawl for source pages");
            Arc::new(FirecrawlFetcher::new(key.clone()))
        }
        None => Arc::new(HttpPageFetcher::new()),
    };

    let cache = match config.cache_backend {
        CacheBackend::Memory => Cache::memory(config.cache_max_entries),
        CacheBackend::None => Cache::disabled(),
    };

    let mut builder = Verifier::builder()
        .config(verifier_config)
        .crossref(crossref)
        .arxiv(arxiv)
        .openalex(openalex)
        .fetcher(fetcher)
        .fetch_concurrency(config.fetch_concurrency)
        .cache(cache);

    builder = match (config.embedding_provider, &config.openai_api_key) {
        (EmbeddingProvider::OpenAi, Some(key)) => {
            builder.embedder(Arc::new(OpenAIEmbedder::new(key.clone())))
        }
        (EmbeddingProvider::None, _) => builder,
        _ => builder.embedder(Arc::new(ClaimTermEmbedder::default())),
    };

    if let Some(key) = &config.openai_api_key {
        let mut provider = OpenAIProvider::new(key.clone());
        if let Some(model) = &config.openai_model {
            provider = provider.with_model(model);
        }
        builder = builder.ai_provider(Arc::new(provider));
    }
    if let Some(key) = &config.gemini_api_key {
        let mut provider = GeminiProvider::new(key.clone());
        if let Some(model) = &config.gemini_model {
            provider = provider.with_model(model);
        }
        builder = builder.ai_provider(Arc::new(provider));
    }

    builder.build()
}

/// Build the Axum application router
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    // CORS: any origin unless a list is configured
    let allow_origin = if cors_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            cors_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    // Multipart framing needs headroom above the document limit
    let body_limit = state.documents.max_bytes() + 64 * 1024;

    let api = Router::new()
        .route("/verify-citation", post(verify_citation_handler))
        .route("/verify-text", post(verify_text_handler))
        .route("/batch-verify", post(batch_verify_handler))
        .route("/upload-document", post(upload_document_handler))
        .route("/detect-hallucinations", post(detect_hallucinations_handler))
        .route("/extract-claims", post(extract_claims_handler))
        .route("/health", get(health_handler));

    let router = Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit));
    with_timeout(router, REQUEST_TIMEOUT)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Abort requests that run past `timeout` with the usual JSON error body.
fn with_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_timeout(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(anyhow::anyhow!(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn slow_requests_get_a_json_408() {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done"
            }),
        );
        let response = with_timeout(slow, Duration::from_millis(20))
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], true);
        assert_eq!(body["status_code"], 408);
        assert_eq!(body["message"], "request timed out");
    }

    #[tokio::test]
    async fn other_layer_errors_are_internal() {
        let err: BoxError = "connection reset".into();
        let api_error = handle_timeout(err).await;
        assert_eq!(api_error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
