//! Reservation desk - conversational table booking service
//!
//! A Rust backend implementing a slot-filling session state machine that
//! walks a guest through a restaurant reservation one question at a time.

mod api;
mod config;
mod interpreter;
mod presentation;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use interpreter::{build_interpreter, Interpreter};
use runtime::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reservation_desk=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();

    let interpreter = build_interpreter(&config.interpreter);
    tracing::info!(
        interpreter = %interpreter.name(),
        interpret_timeout_secs = config.runtime.interpret_timeout.as_secs(),
        idle_timeout_secs = config.runtime.idle_timeout.as_secs(),
        "Interpreter initialized"
    );

    // Create application state
    let state = AppState::new(interpreter, config.runtime);
    let sessions = state.sessions.clone();

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Reservation desk listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C after stopping every session actor
async fn shutdown_signal(sessions: Arc<SessionManager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
    sessions.shutdown();
}
