//! Manuscript Server
//!
//! A self-hosted OCR calibration server: upload folders of scanned
//! pages, run them through a remote OCR service, calibrate the
//! recognized text regions, and export the reconciled result.

use std::net::SocketAddr;

use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manuscript_server::config::Config;
use manuscript_server::db;
use manuscript_server::routes;
use manuscript_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manuscript_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Manuscript Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("OCR endpoint: {}", config.ocr.endpoint);

    // Initialize database
    let db_pool = db::create_pool(&config.storage.database_url)
        .await
        .expect("Failed to initialize database");
    tracing::info!("Database initialized at {}", config.storage.database_url);

    let bind_addr = config.server.bind_addr.clone();
    let app_state = AppState::new(config, db_pool);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server with graceful shutdown
    let addr: SocketAddr = bind_addr.parse().expect("invalid BIND_ADDR");
    tracing::info!("Manuscript Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
