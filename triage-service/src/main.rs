use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::{Dispatcher, TriageConfig};
use triage_service::{build_router, create_app_state};

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "triage_service=debug,triage_core=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            // Human-readable logging for development
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[cfg(feature = "llm")]
fn create_dispatcher(config: &TriageConfig) -> triage_core::Result<Dispatcher> {
    if std::env::var("TRIAGE_INTENT_BACKEND").as_deref() == Ok("llm") {
        info!("Using LLM intent classifier");
        let classifier = triage_core::LlmIntentClassifier::from_env()?;
        return triage_core::build_dispatcher_with(config, Arc::new(classifier));
    }
    triage_core::build_dispatcher(config)
}

#[cfg(not(feature = "llm"))]
fn create_dispatcher(config: &TriageConfig) -> triage_core::Result<Dispatcher> {
    triage_core::build_dispatcher(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = TriageConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    // Models and reference data are required before serving any traffic
    let dispatcher = create_dispatcher(&config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to load triage models");
        std::process::exit(1);
    });
    info!(
        conditions = dispatcher.index().len(),
        confidence_threshold = config.confidence_threshold,
        max_attempts = config.max_attempts,
        "Triage models loaded"
    );

    let app = build_router(create_app_state(Arc::new(dispatcher), &config));

    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
