// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daybreak API Server
//!
//! Serves calendar, sleep, and sun data for the day-at-a-glance dashboard.

use daybreak::{
    config::{Config, TokenStoreKind},
    db::{FirestoreDb, MemoryDb, TokenRepository},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Daybreak API");

    let repo: Arc<dyn TokenRepository> = match config.token_store {
        TokenStoreKind::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        TokenStoreKind::Memory => {
            tracing::warn!("Using in-memory token store; tokens are lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), repo)?);

    // Build router
    let app = daybreak::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("daybreak=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
