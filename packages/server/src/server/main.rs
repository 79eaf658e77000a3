// Main entry point for API server

use anyhow::{Context, Result};
use server_core::{
    server::{build_app, build_verifier, AppState},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,verification=debug,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Citation Verification API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        cache = ?config.cache_backend,
        embeddings = ?config.embedding_provider,
        "Configuration loaded"
    );

    // Build application
    let verifier = build_verifier(&config);
    let providers = verifier.ai_providers();
    if providers.is_empty() {
        tracing::warn!("No AI provider configured, AI scoring will be skipped");
    } else {
        tracing::info!(?providers, "AI providers configured");
    }
    let app = build_app(AppState::new(verifier), &config.cors_origins);

    // Start server
    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/api/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
