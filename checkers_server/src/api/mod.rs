//! HTTP/WebSocket API for the checkers room server.
//!
//! Gameplay happens over a single WebSocket endpoint; the HTTP routes are
//! read-only and exist for monitoring and debugging.
//!
//! # Modules
//!
//! - [`websocket`]: JSON command protocol and room broadcasts
//! - [`rooms`]: Read-only room lookups
//! - [`rate_limiter`]: Per-connection frame limits
//! - [`request_id`]: `x-request-id` correlation middleware
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /                      - Liveness text
//! GET  /health                - Health status with active room count
//! GET  /api/v1/rooms/{code}   - Room snapshot (404 when unknown)
//! GET  /ws                    - WebSocket upgrade
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use checkers::{RoomConfig, RoomDirectory};
//! use checkers_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState {
//!     directory: Arc::new(RoomDirectory::new(RoomConfig::default())),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively so browser clients served from another
//! origin can connect during development.

pub mod rate_limiter;
pub mod request_id;
pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use checkers::RoomDirectory;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<RoomDirectory>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with the room directory
///
/// # Returns
///
/// Configured Axum router ready to serve requests
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new().route("/rooms/{code}", get(rooms::get_room));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "checkers server is running"
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.1.0","rooms":{"active_count":2},"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let room_count = state.directory.room_count().await;

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": {
            "active_count": room_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}
