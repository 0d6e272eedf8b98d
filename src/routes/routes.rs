//! Defines routes for the download, listing and gallery API.
//!
//! ## Structure
//! - **Downloads**
//!   - `GET  /api/download-mod?path=` — one object as an attachment
//!   - `GET  /api/download-modpack`   — the whole bucket as a ZIP
//!
//! - **Bucket browsing**
//!   - `GET  /api/files?prefix=`      — list objects under a prefix
//!   - `GET  /api/object-url?key=`    — signed read URL (5 minutes)
//!   - `GET  /files/{*key}`           — stream an object body
//!
//! - **Gallery**
//!   - `GET  /api/gallery`            — list gallery records
//!   - `POST /api/gallery`            — upload an image (signed-in users)
//!   - `GET  /api/session`            — current session user or `null`
//!
//! The wildcard `*key` allows nested keys like `gallery/1699000000000_a.png`.

use crate::{
    handlers::{
        download_handlers::{download_mod, download_modpack},
        file_handlers::{list_files, object_url, serve_file},
        gallery_handlers::{current_session, list_gallery, upload_gallery_image},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};

/// Largest accepted gallery upload request, form overhead included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build and return the router for every API route.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Downloads
        .route("/api/download-mod", get(download_mod))
        .route("/api/download-modpack", get(download_modpack))
        // Bucket browsing
        .route("/api/files", get(list_files))
        .route("/api/object-url", get(object_url))
        .route("/files/{*key}", get(serve_file))
        // Gallery
        .route(
            "/api/gallery",
            get(list_gallery)
                .post(upload_gallery_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/session", get(current_session))
}
