//! candor - Real-time interview consistency analysis service
//!
//! Ingests speaker-tagged transcript chunks over WebSocket and maintains,
//! per session, a noise-resistant picture of the candidate's factual
//! consistency and the interviewer's progress through the script.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use candor::config::{resolve_openai_api_key, TomlConfig};
use candor::models::InterviewScript;
use candor::services::OpenAiClassifier;
use candor::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("candor=info,tower_http=info")),
        )
        .init();

    info!("Starting candor (interview consistency analysis)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = TomlConfig::load()?;
    let api_key = resolve_openai_api_key(&config);
    let classifier = Arc::new(OpenAiClassifier::new(api_key, &config)?);

    let script = Arc::new(config.script.clone().unwrap_or_default());
    info!(
        sections = script.total_sections(),
        subsections = script.total_subsections(),
        "Interview script loaded"
    );

    let state = AppState::new(classifier, script, config.analysis.clone());
    let app = candor::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Listening on http://{}", config.listen_addr());
    info!("Session socket: ws://{}/ws", config.listen_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
