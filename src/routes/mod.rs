//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay exposes two endpoints: a multipart upload that stores a
//! presentation and hands back a retrieval URL, and a retrieval endpoint
//! that serves the stored bytes with a forced presentation content type so
//! the browser-side viewer renders them. CORS is fully open; browsers load
//! the retrieval URL cross-origin.

pub mod uploads;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the relay router. `max_upload_bytes` bounds the multipart body.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(uploads::upload))
        .route("/uploads/{filename}", get(uploads::download))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
