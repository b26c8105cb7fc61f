use axum::{routing::get, Router};
use linescan_server::{
    config::ServerConfig, handlers::health_check, scan::LineBuffer, state::AppState,
    stream::handle_websocket,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linescan_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting line-scan streaming server v{}", VERSION);

    // Load configuration from environment
    let config = ServerConfig::from_env()?;

    // Resolve the scan source; a load failure never aborts startup
    let buffer = LineBuffer::load_or_fallback(
        config.image_path.as_deref(),
        &config.default_image_path,
    );
    info!("Scan source ready: {}x{} pixels", buffer.width(), buffer.height());

    let state = Arc::new(AppState::new(buffer, config.line_interval));

    // Build router
    let app = Router::new()
        .route("/ws/stream", get(handle_websocket))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws/stream", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
