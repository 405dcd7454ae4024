//! Flight Planner - airline flight planning chat bot
//!
//! A Rust backend implementing a guided flight planning state machine
//! behind an HTTP message gateway, plus a frequent flyer program.

mod airport;
mod api;
mod config;
mod db;
mod loyalty;
mod parse;
mod render;
mod runtime;
mod session;
mod state_machine;

use api::{create_router, AppState};
use config::PlannerConfig;
use db::Database;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_planner=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = PlannerConfig::from_env();
    let port = config.port;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening loyalty database");
    let db = Database::open(&config.db_path)?;

    match &config.dispatch_channel {
        Some(channel) => tracing::info!(channel_id = %channel, "Flight plans dispatch to channel"),
        None => tracing::warn!(
            "No dispatch channel configured. Set FLIGHT_PLANNER_DISPATCH_CHANNEL or flight plans cannot be sent."
        ),
    }

    // Create application state
    let idle_timeout = config.idle_timeout;
    let state = AppState::new(config, db)?;

    // Expire abandoned sessions in the background
    let shutdown = CancellationToken::new();
    let sweeper = runtime::spawn_session_sweeper(
        state.sessions().clone(),
        idle_timeout,
        SWEEP_INTERVAL,
        shutdown.clone(),
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Flight planner listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    sweeper.await?;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        }
        () = shutdown.cancelled() => {}
    }
    tracing::info!("Shutting down");
}
