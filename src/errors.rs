use crate::services::{
    download_service::DownloadError, gallery_service::GalleryError, object_store::StorageError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// An HTTP-facing error: a status plus the message shown to the client.
///
/// Domain errors convert into this at the handler boundary. Internal detail
/// is logged there and replaced with a generic message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::not_found("File not found"),
            StorageError::InvalidKey(key) => {
                AppError::bad_request(format!("Invalid object key `{}`", key))
            }
            other => {
                tracing::error!("object store error: {}", other);
                AppError::internal("Storage backend error")
            }
        }
    }
}

impl From<DownloadError> for AppError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::NotFound(_) => AppError::not_found("File not found"),
            DownloadError::EmptyBucket => AppError::not_found("No files found in bucket"),
            DownloadError::NothingAdded { listed } => {
                tracing::error!("modpack build failed: all {} fetches failed", listed);
                AppError::internal("No files could be added to the modpack")
            }
            DownloadError::Storage(StorageError::InvalidKey(key)) => {
                AppError::bad_request(format!("Invalid object key `{}`", key))
            }
            other => {
                tracing::error!("download failed: {}", other);
                AppError::internal("Failed to download file")
            }
        }
    }
}

impl From<GalleryError> for AppError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::Validation(msg) => AppError::bad_request(msg),
            GalleryError::QuotaExceeded { limit } => AppError::forbidden(format!(
                "You can only upload up to {} images",
                limit
            )),
            other => {
                tracing::error!("gallery operation failed: {}", other);
                AppError::internal("Failed to process gallery request")
            }
        }
    }
}
