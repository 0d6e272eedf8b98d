//! Gallery image records kept in SQLite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Maximum number of gallery images a single user may own.
pub const MAX_IMAGES_PER_USER: i64 = 3;

/// Maximum description length, counted in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 50;

/// Metadata for one uploaded gallery image.
///
/// The image bytes live in the bucket; `image_url` points at them.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: Uuid,

    /// Public URL of the stored image.
    pub image_url: String,

    pub description: String,

    /// Session uid of the uploader.
    pub uploaded_by: String,

    pub uploaded_at: DateTime<Utc>,
}

/// An image received from the upload form, not yet validated.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
    pub description: String,
}
