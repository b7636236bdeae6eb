//! Defines routes for the video relay API.
//!
//! ## Structure
//! - `POST   /download`          — download a post's video, upload it, return a link
//! - `POST   /resolve`           — return the direct media URL only
//! - `GET    /url/{fileId}`      — regenerate the link of an earlier upload
//! - `DELETE /delete/{fileId}`   — remove an upload
//! - `GET    /healthz`, `/readyz` — probes

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::{delete_video, download_video, get_video_url, resolve_video},
    },
    services::media_service::MediaService,
};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build and return the router for all API routes.
///
/// The router carries shared state (`MediaService`) to all handlers.
pub fn routes() -> Router<MediaService> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // media lifecycle
        .route("/download", post(download_video))
        .route("/resolve", post(resolve_video))
        .route("/url/{file_id}", get(get_video_url))
        .route("/delete/{file_id}", delete(delete_video))
        .layer(TraceLayer::new_for_http())
}
