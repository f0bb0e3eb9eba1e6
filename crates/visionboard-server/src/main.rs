//! VisionBoard Board Server
//!
//! Stores boards per account in memory and serves them over a small REST API.
//!
//! ## Endpoints
//!
//! ```text
//! GET    /api/boards          board summaries, newest first
//! POST   /api/boards          create a board
//! GET    /api/boards/{id}     board with cards, settings and history
//! PUT    /api/boards/{id}     save cards and settings
//! PATCH  /api/boards/{id}     rename
//! DELETE /api/boards/{id}     delete
//! POST   /api/unfurl          preview media for a link
//! GET    /health
//! ```
//!
//! Every `/api` request carries the account in an `x-account-id` header.

mod api;
mod config;
mod state;

use axum::extract::DefaultBodyLimit;
use config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Body size cap as a multiple of the payload quota. The repository enforces the quota itself.
const BODY_LIMIT_FACTOR: usize = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visionboard_server=info,tower_http=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let state = Arc::new(AppState::new(&config)?);
    let body_limit = state.limits().max_payload_bytes.saturating_mul(BODY_LIMIT_FACTOR);

    let app = api::routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("VisionBoard server listening on {}", config.addr);
    info!(
        "Limits: {} boards per account, {} byte payloads, {} history entries",
        config.limits.max_boards, config.limits.max_payload_bytes, config.limits.history_cap
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
