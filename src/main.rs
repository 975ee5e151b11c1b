use anyhow::Context;
use community_hub::{build_app, AppConfig, AppState};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 STARTUP: Starting community hub server...");

    // Load configuration from environment
    let config = AppConfig::from_env();
    info!("Server configuration loaded");

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;
    info!("✅ STARTUP: Application state initialized ({} backend)", app_state.db.backend());

    if let Err(e) = app_state.bootstrap().await {
        error!("❌ STARTUP: Bootstrap failed: {}", e);
        return Err(e.into());
    }

    // Build our application with routes
    let app = build_app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config
        .server_address()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_address()))?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server running on http://{}", config.server_address());

    // Start serving requests
    axum::serve(listener, app).await?;

    Ok(())
}
