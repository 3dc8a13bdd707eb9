//! HTTP surface: a WebSocket endpoint and a health probe.

pub mod limiter;
pub mod websocket;

use std::sync::Arc;

use axum::{Router, routing::get};
use pokerroom::session::SessionCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
