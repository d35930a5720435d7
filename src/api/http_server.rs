// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::{detect_handler, reset_handler, upload_handler};
use super::page::index_handler;
use crate::reasoning::ReasoningClient;
use crate::session::Session;
use crate::vision::InstrumentDetector;

/// Shared state injected into every handler
///
/// The detector and reasoning client are constructed once in `main` and
/// passed in; nothing here is fetched from ambient global state.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<InstrumentDetector>,
    pub reasoning: Arc<ReasoningClient>,
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    pub fn new(detector: Arc<InstrumentDetector>, reasoning: Arc<ReasoningClient>) -> Self {
        Self {
            detector,
            reasoning,
            session: Arc::new(RwLock::new(Session::new())),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        // The page itself
        .route("/", get(index_handler))
        // Health check
        .route("/health", get(health_handler))
        // Pipeline endpoints
        .route("/v1/upload", post(upload_handler))
        .route("/v1/detect", post(detect_handler))
        .route("/v1/reset", post(reset_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the API until ctrl-c
pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let phase = state.session.read().await.phase();
    axum::response::Json(json!({
        "status": "ok",
        "phase": phase,
    }))
}
