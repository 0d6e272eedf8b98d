//! Represents an object (file) stored in the bucket.

use serde::{Deserialize, Serialize};

/// A single stored object as reported by a bucket listing.
///
/// Only the key and size are tracked; the body lives in the bucket and is
/// fetched on demand.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Size in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,
}

/// Bytes and placement of a file to be written into the bucket.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub bytes: bytes::Bytes,
    pub file_name: String,
    pub folder: String,
    pub content_type: Option<String>,
}

impl UploadRequest {
    /// Full object key, `folder/file_name`.
    pub fn key(&self) -> String {
        let folder = self.folder.trim_matches('/');
        if folder.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", folder, self.file_name)
        }
    }
}

/// What the provider reported after a successful upload.
#[derive(Serialize, Clone, Debug)]
pub struct UploadResult {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}

/// Derive a download filename from an object key.
pub fn file_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Guess a MIME type from the key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = file_name_from_key(key)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jar") => "application/java-archive",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("json") => "application/json",
        Some("toml") => "application/toml",
        Some("txt") | Some("cfg") => "text/plain",
        _ => "application/octet-stream",
    }
}
