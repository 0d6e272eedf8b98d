//! The `ObjectStore` seam: every bucket operation the API performs goes
//! through this trait so handlers never see a concrete provider.

use crate::models::object::{StoredObject, UploadRequest, UploadResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::{io, pin::Pin, time::Duration};
use thiserror::Error;

/// Stream of bytes for object content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("object store unavailable: {source}")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Wrap any provider error as `Unavailable`.
    pub fn unavailable<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            source: Box::new(error),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Basic key validation to avoid trivial path traversal vectors.
///
/// Rejects keys that begin with `/`, contain `..`, backslashes or control
/// bytes, or exceed the S3 key length limit. Every backend applies it, so a
/// bad key is `InvalidKey` wherever the bucket lives.
pub fn ensure_key_safe(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key.len() > MAX_OBJECT_KEY_LEN
        || key.starts_with('/')
        || key.contains("..")
        || key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Bucket operations used by the download, listing and gallery flows.
///
/// Implementations perform plain I/O only: no retries, no caching.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object under `prefix` (or the whole bucket), sorted by key.
    async fn list_objects(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>>;

    /// Open the object body as a stream. A missing key is `NotFound`.
    async fn get_object_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Metadata-only existence probe.
    async fn object_exists(&self, key: &str) -> StorageResult<bool>;

    /// Write `request.bytes` under `folder/file_name` with public-read access.
    /// An existing object with the same key is overwritten.
    async fn upload_file(&self, request: UploadRequest) -> StorageResult<UploadResult>;

    /// A URL granting read access to `key` for `expires_in`.
    async fn object_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsafe_keys() {
        let too_long = "a".repeat(MAX_OBJECT_KEY_LEN + 1);
        for key in ["", "/etc/passwd", "mods/../secret", "a\\b", "a\nb", too_long.as_str()] {
            assert!(
                matches!(ensure_key_safe(key), Err(StorageError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
        assert!(ensure_key_safe("mods/create-1.20.1-6.0.4.jar").is_ok());
        assert!(ensure_key_safe("resourcepacks/Faithful 32x.zip").is_ok());
    }
}
