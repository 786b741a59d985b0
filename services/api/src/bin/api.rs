//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, GoogleGeocodingAdapter, GooglePlacesAdapter, OpenAiChatAdapter,
        OpenAiStructuredAdapter,
    },
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::CONTENT_TYPE, Method};
use axum::Router;
use intake_core::{ConversationEngine, IntakeService, SearchPipeline};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Timeout for every call to the Google APIs.
const GOOGLE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_client =
        Client::with_config(OpenAIConfig::new().with_api_key(config.openai_api_key.clone()));
    let http = reqwest::Client::builder()
        .timeout(GOOGLE_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let chat_adapter = Arc::new(OpenAiChatAdapter::new(
        openai_client.clone(),
        config.chat_model.clone(),
    ));
    let structured_adapter = Arc::new(OpenAiStructuredAdapter::new(
        openai_client,
        config.extraction_model.clone(),
    ));
    let places_adapter = Arc::new(GooglePlacesAdapter::new(
        http.clone(),
        config.google_places_api_key.clone(),
    ));
    let geocoding_adapter = Arc::new(GoogleGeocodingAdapter::new(
        http,
        config.google_places_api_key.clone(),
    ));

    // --- 4. Build the Core Services & the Shared AppState ---
    let engine = ConversationEngine::new(chat_adapter, config.engine_config());
    let intake = Arc::new(IntakeService::new(db_adapter.clone(), engine));
    let pipeline = Arc::new(SearchPipeline::new(
        structured_adapter,
        places_adapter,
        geocoding_adapter,
        db_adapter.clone(),
        config.pipeline_config(),
    ));

    let app_state = Arc::new(AppState {
        intake,
        results: db_adapter,
        pipeline,
    });

    // --- 5. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
