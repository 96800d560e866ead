//! Stamp API Server - REST backend for visual PDF signing
//!
//! Provides REST endpoints for:
//! - Uploading source PDFs and signature images
//! - Stamping a signature onto every page of a document
//! - Downloading the signed result
//!
//! Records and files older than the retention window are swept periodically.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod models;
mod retention;
mod state;
mod storage;
mod store;
mod validation;


use config::ServiceConfig;
use state::AppState;

/// Multipart framing on top of the file itself
const BODY_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(BODY_OVERHEAD);

    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Documents
        .route(
            "/api/documents",
            post(handlers::create_document).get(handlers::list_documents),
        )
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        // Signatures
        .route(
            "/api/signatures",
            post(handlers::create_signature).get(handlers::list_signatures),
        )
        .route(
            "/api/signatures/:id",
            get(handlers::get_signature).delete(handlers::delete_signature),
        )
        // Signed documents
        .route(
            "/api/signed-documents",
            post(handlers::create_signed_document).get(handlers::list_signed_documents),
        )
        .route(
            "/api/signed-documents/:id",
            get(handlers::get_signed_document).delete(handlers::delete_signed_document),
        )
        .route(
            "/api/signed-documents/:id/download",
            get(handlers::download_signed_document),
        )
        // Add middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = ServiceConfig::parse();

    // Initialize tracing
    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("stamp_api={0},stamp_core={0},tower_http=debug", default_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize application state
    info!("Initializing Stamp API...");
    let state = Arc::new(AppState::new(&config).await?);

    if config.sweep_once {
        let report = retention::sweep(&state, config.retention()).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    retention::spawn_sweeper(state.clone(), config.retention(), config.sweep_interval());

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting Stamp API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
