//! Core data models for the download and gallery API.
//!
//! Stored objects describe what the bucket holds; gallery images map to the
//! `gallery_images` table via `sqlx::FromRow` and serialize as JSON via `serde`.

pub mod gallery;
pub mod object;
