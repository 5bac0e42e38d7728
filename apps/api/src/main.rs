mod config;
mod cv;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::cv::pipeline::CvPipeline;
use crate::cv::vectorizer::EmbeddingLimiter;
use crate::llm_client::{LlmApi, OpenRouterClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Vectorizer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client (shared read-only by every request)
    let llm: Arc<dyn LlmApi> = Arc::new(OpenRouterClient::new(
        config.openai_api_key.clone(),
        config.llm_base_url.clone(),
        Duration::from_secs(config.llm_timeout_secs),
        config.llm_max_attempts,
    )?);
    info!(
        "LLM client initialized (base: {}, extraction: {}, embeddings: {}, attempts: {})",
        config.llm_base_url,
        llm_client::EXTRACTION_MODEL,
        llm_client::EMBEDDING_MODEL,
        config.llm_max_attempts
    );

    let limiter = match config.embedding_concurrency {
        Some(n) => {
            info!("Embedding concurrency capped at {n}");
            EmbeddingLimiter::bounded(n)
        }
        None => EmbeddingLimiter::unbounded(),
    };

    let state = AppState {
        pipeline: Arc::new(CvPipeline::new(
            llm,
            config.extraction_text_budget,
            limiter,
        )),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_origin)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `*` allows any origin; anything else is the single allowed origin, with credentials.
fn build_cors(origin: &str) -> Result<CorsLayer> {
    if origin.trim() == "*" {
        return Ok(CorsLayer::permissive());
    }

    let origin = HeaderValue::from_str(origin.trim())
        .with_context(|| format!("CORS_ORIGIN is not a valid header value: {origin}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true))
}
