//! JSON HTTP surface for a browser UI.
//!
//! - `GET    /health`
//! - `GET    /api/messages`  conversation snapshot
//! - `POST   /api/messages`  submit a turn
//! - `GET    /api/status`    sending flag, message count, document
//! - `GET    /api/document`  current document context
//! - `PUT    /api/document`  upload a PDF (raw body, optional `x-file-name`)
//! - `DELETE /api/document`  drop the document context
//! - `GET    /api/settings`  effective settings, key masked

pub mod chat;
pub mod documents;
pub mod settings;

use crate::config::AppConfig;
use crate::session::ChatSession;
use axum::extract::DefaultBodyLimit;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub session: Arc<ChatSession>,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/messages",
            get(chat::get_messages).post(chat::send_message),
        )
        .route("/api/status", get(chat::get_status))
        .route(
            "/api/document",
            get(documents::get_document)
                .put(documents::upload_document)
                .delete(documents::remove_document),
        )
        .route("/api/settings", get(settings::get_settings))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
