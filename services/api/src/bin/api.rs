//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, WebhookNotifier},
    config::Config,
    error::ApiError,
    web::{self, state::AppState, ApiDoc},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use streak_core::{
    CheckinNotifier, GoalStore, HistoryStore, InMemoryStore, LogNotifier, StreakEngine,
};
use tokio_util::sync::CancellationToken;
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

    // --- 2. Connect to Database & Run Migrations ---
    let (goal_store, history_store): (Arc<dyn GoalStore>, Arc<dyn HistoryStore>) =
        match &config.database_url {
            Some(database_url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                (db_adapter.clone() as Arc<dyn GoalStore>, db_adapter as Arc<dyn HistoryStore>)
            }
            None => {
                warn!("DATABASE_URL not set; goals are kept in memory and lost on restart");
                let store = Arc::new(InMemoryStore::new());
                (store.clone() as Arc<dyn GoalStore>, store as Arc<dyn HistoryStore>)
            }
        };

    // --- 3. Initialize the Notifier ---
    let notifier: Arc<dyn CheckinNotifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Check-in notifications go to {}", url);
            Arc::new(
                WebhookNotifier::new(url.clone(), config.notify_token.clone())
                    .map_err(|e| ApiError::Internal(format!("HTTP client: {}", e)))?,
            )
        }
        None => Arc::new(LogNotifier),
    };

    // --- 4. Build the Shared AppState ---
    let engine = StreakEngine::new(goal_store, history_store, notifier, config.engine_config());
    info!("Goal policy: {:?}", engine.config().policy);
    let app_state = Arc::new(AppState {
        engine: Arc::new(engine),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(web::middleware::IDENTITY_HEADER),
        ]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
            shutdown.cancel();
        }
    });

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
