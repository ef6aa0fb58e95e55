//! services/api/src/bin/api.rs
//!
//! The main entry point for the API server binary.

use api_lib::{
    adapters::{CommandPdfRenderer, JsonFileRepository, OpenAiCompletionAdapter},
    config::Config,
    error::ApiError,
    web::{api_router, ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::ACCEPT, header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use fiche_core::{SheetGenerator, SheetStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Load the Sheet Store ---
    info!("Reading sheets from {}", config.sheets_path.display());
    let repository = Arc::new(JsonFileRepository::new(config.sheets_path.clone()));
    let store = SheetStore::open(repository).await;
    if let Some(issue) = store.startup_issue() {
        warn!("Starting with an empty sheet list: {}", issue);
    }

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.llm_api_key.clone());
    if let Some(api_base) = &config.llm_api_base {
        openai_config = openai_config.with_api_base(api_base.clone());
    }
    let openai_client = Client::with_config(openai_config);
    let completion_adapter = Arc::new(OpenAiCompletionAdapter::new(
        openai_client,
        config.generation_model.clone(),
    ));
    let pdf_renderer = Arc::new(CommandPdfRenderer::new(config.pdf_renderer.clone()));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        store,
        SheetGenerator::new(completion_adapter),
        pdf_renderer,
    ));

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
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
