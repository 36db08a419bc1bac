//! services/timer/src/bin/timer.rs

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use timer_lib::{
    adapters::{BroadcastNotifier, InMemoryProjectStore, PgProjectStore, SystemClock, WatchIdentityProvider},
    config::Config,
    error::TimerServiceError,
    timer::{ControllerSettings, TimerController},
    web::{rest::ApiDoc, router, state::AppState},
};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use worktimer_core::ports::ProjectStore;

#[tokio::main]
async fn main() -> Result<(), TimerServiceError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting timer service...");

    // --- 2. Connect the Document Store ---
    let store: Arc<dyn ProjectStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let pg_store = PgProjectStore::new(db_pool);
            info!("Running database migrations...");
            pg_store.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(pg_store)
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory project store.");
            match &config.seed_file {
                Some(path) => Arc::new(InMemoryProjectStore::from_seed_file(path).await?),
                None => Arc::new(InMemoryProjectStore::new()),
            }
        }
    };

    // --- 3. Build the Timer Controller ---
    let identity = config.identity();
    if identity.is_anonymous() {
        warn!("No TIMER_USER_ID or TIMER_USER_EMAIL configured; the timer will stay idle.");
    }
    let identity_provider = Arc::new(WatchIdentityProvider::new(identity));
    let notices = Arc::new(BroadcastNotifier::new());
    let controller = TimerController::new(
        store,
        identity_provider,
        notices.clone(),
        Arc::new(SystemClock),
        ControllerSettings {
            max_write_retries: config.max_write_retries,
        },
    );
    let sync_handle = controller.spawn_sync();

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        controller: controller.clone(),
        notices,
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        TimerServiceError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    // --- 7. Tear Down the Subscription ---
    controller.shutdown();
    if let Err(e) = sync_handle.await {
        error!("Timer sync task ended abnormally: {:?}", e);
    }
    info!("Timer service stopped.");
    Ok(())
}
