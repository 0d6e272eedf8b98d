//! Backend for the Netherious server website: mod and modpack downloads
//! served from an S3-compatible bucket, bucket listings for the resource
//! pack pages, and a small user-uploaded image gallery.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// The full application router with state attached.
pub fn build_router(state: AppState) -> Router {
    routes::routes::routes().with_state(state)
}
