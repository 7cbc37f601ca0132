mod config;
mod metrics;
mod models;
mod routes;
mod services;
mod state;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{
    cleanup::{start_cleanup_task, CleanupConfig},
    consumet::ConsumetClient,
};
pub use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anime_watch_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting anime watch server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app_env);

    // Anime API client
    let api = ConsumetClient::new(
        &config.consumet_api_url,
        &config.consumet_meta,
        Duration::from_millis(config.fetch_timeout_ms),
        &config.user_agent,
    )?;
    tracing::info!(
        "Consumet API: {} (meta {}, default provider {})",
        config.consumet_api_url,
        config.consumet_meta,
        config.default_provider
    );

    let cleanup = CleanupConfig {
        interval_secs: config.cleanup_interval_secs,
    };
    let base_url = config.base_url.clone();

    // Build application state
    let state = Arc::new(AppState::new(config, Arc::new(api))?);

    // Start cleanup task (runs in background)
    tokio::spawn(start_cleanup_task(state.clone(), cleanup));
    tracing::info!("Cleanup task started");

    let app = routes::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{} (public URL {})", addr, base_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
