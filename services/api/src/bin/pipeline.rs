//! services/api/src/bin/pipeline.rs
//!
//! Runs the search pipeline once, in the foreground, over the most recently
//! created intake session.

use api_lib::{
    adapters::{DbAdapter, GoogleGeocodingAdapter, GooglePlacesAdapter, OpenAiStructuredAdapter},
    config::Config,
    error::ApiError,
};
use async_openai::{config::OpenAIConfig, Client};
use intake_core::ports::TranscriptStore;
use intake_core::SearchPipeline;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    db_adapter.run_migrations().await?;

    let Some(session_id) = db_adapter.latest_session_id().await? else {
        warn!("No intake sessions found. Nothing to do.");
        return Ok(());
    };
    let session = db_adapter.get_session(session_id).await?;
    info!(
        "Running pipeline for session {} ({} turns)",
        session_id,
        session.turns.len()
    );

    let openai_client =
        Client::with_config(OpenAIConfig::new().with_api_key(config.openai_api_key.clone()));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let pipeline = SearchPipeline::new(
        Arc::new(OpenAiStructuredAdapter::new(
            openai_client,
            config.extraction_model.clone(),
        )),
        Arc::new(GooglePlacesAdapter::new(
            http.clone(),
            config.google_places_api_key.clone(),
        )),
        Arc::new(GoogleGeocodingAdapter::new(
            http,
            config.google_places_api_key.clone(),
        )),
        db_adapter,
        config.pipeline_config(),
    );

    let report = pipeline.run(&session.turns).await?;
    for entry in &report.entries {
        info!(
            "{} -> {} companies ({})",
            entry.application,
            entry.places.len(),
            entry.status.as_str()
        );
    }
    info!(
        "Pipeline complete: {} applications processed.",
        report.applications.len()
    );
    Ok(())
}
