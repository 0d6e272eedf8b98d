//! src/services/disk_store.rs
//!
//! DiskStore — an `ObjectStore` backed by a local directory. Object keys map
//! directly to paths beneath `base_path`, so `mods/a.jar` lives at
//! `base_path/mods/a.jar`. Used for local development and tests; production
//! runs against R2.

use crate::{
    models::object::{StoredObject, UploadRequest, UploadResult},
    services::object_store::{
        ByteStream, ObjectStore, StorageError, StorageResult, ensure_key_safe,
    },
};
use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const TMP_PREFIX: &str = ".tmp-";

#[derive(Clone, Debug)]
pub struct DiskStore {
    /// Directory holding the object payloads.
    pub base_path: PathBuf,

    /// Prefix for URLs handed out by `object_url`, e.g. `http://localhost:3000/files`.
    pub public_base_url: String,
}

impl DiskStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    /// Rebuild an object key from a path beneath `base_path`.
    fn key_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("/"))
    }

    /// Walk the directory tree and collect every regular file.
    async fn walk(&self, root: PathBuf) -> io::Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                        continue;
                    }
                    if let Some(key) = self.key_for_path(&path) {
                        let size_bytes = entry.metadata().await?.len();
                        objects.push(StoredObject { key, size_bytes });
                    }
                }
            }
        }
        Ok(objects)
    }
}

#[async_trait]
impl ObjectStore for DiskStore {
    async fn list_objects(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        let mut objects = self.walk(self.base_path.clone()).await?;
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            objects.retain(|obj| obj.key.starts_with(prefix));
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!("listed {} objects under {:?}", objects.len(), prefix);
        Ok(objects)
    }

    async fn get_object_stream(&self, key: &str) -> StorageResult<ByteStream> {
        // Directories open fine on Linux but fail on first read; only
        // regular files are objects.
        if !self.object_exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let file = File::open(self.object_path(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        ensure_key_safe(key)?;
        match fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Write to a temporary file, fsync, then rename into place so readers
    /// never observe a half-written object.
    async fn upload_file(&self, request: UploadRequest) -> StorageResult<UploadResult> {
        let key = request.key();
        ensure_key_safe(&key)?;

        let file_path = self.object_path(&key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));

        let write = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(&request.bytes).await?;
            file.flush().await?;
            file.sync_all().await
        };
        if let Err(err) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        Ok(UploadResult {
            key,
            size_bytes: request.bytes.len() as u64,
            etag: Some(format!("{:x}", md5::compute(&request.bytes))),
        })
    }

    /// Local files carry no signature; the expiry is ignored.
    async fn object_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        ensure_key_safe(key)?;
        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key
        ))
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::buffer::collect_stream;
    use bytes::Bytes;

    fn upload(folder: &str, name: &str, body: &'static [u8]) -> UploadRequest {
        UploadRequest {
            bytes: Bytes::from_static(body),
            file_name: name.into(),
            folder: folder.into(),
            content_type: None,
        }
    }

    #[tokio::test]
    async fn unsafe_keys_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "http://localhost/files");
        assert!(matches!(
            store.get_object_stream("mods/../../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.upload_file(upload("mods/..", "x.jar", b"x")).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn upload_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "http://localhost/files");

        let result = store
            .upload_file(upload("mods", "a.jar", b"jar-bytes"))
            .await
            .unwrap();
        assert_eq!(result.key, "mods/a.jar");
        assert_eq!(result.size_bytes, 9);
        assert_eq!(
            result.etag.as_deref(),
            Some(format!("{:x}", md5::compute(b"jar-bytes")).as_str())
        );

        assert!(store.object_exists("mods/a.jar").await.unwrap());
        let body = collect_stream(store.get_object_stream("mods/a.jar").await.unwrap())
            .await
            .unwrap();
        assert_eq!(&body[..], b"jar-bytes");
    }

    #[tokio::test]
    async fn upload_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "http://localhost/files");

        store.upload_file(upload("", "x.txt", b"one")).await.unwrap();
        store.upload_file(upload("", "x.txt", b"two!")).await.unwrap();

        let listed = store.list_objects(None).await.unwrap();
        assert_eq!(
            listed,
            vec![StoredObject {
                key: "x.txt".into(),
                size_bytes: 4
            }]
        );
    }

    #[tokio::test]
    async fn list_is_sorted_and_prefix_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "http://localhost/files");
        store.upload_file(upload("mods", "b.jar", b"b")).await.unwrap();
        store.upload_file(upload("mods", "a.jar", b"a")).await.unwrap();
        store
            .upload_file(upload("resourcepacks", "faithful.zip", b"rp"))
            .await
            .unwrap();

        let all: Vec<String> = store
            .list_objects(None)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(all, ["mods/a.jar", "mods/b.jar", "resourcepacks/faithful.zip"]);

        let mods = store.list_objects(Some("mods/")).await.unwrap();
        assert_eq!(mods.len(), 2);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "http://localhost/files");

        assert!(!store.object_exists("mods/missing.jar").await.unwrap());
        assert!(matches!(
            store.get_object_stream("mods/missing.jar").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn directory_is_not_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), "http://localhost/files");
        store.upload_file(upload("mods", "a.jar", b"a")).await.unwrap();

        assert!(!store.object_exists("mods").await.unwrap());
        assert!(matches!(
            store.get_object_stream("mods").await,
            Err(StorageError::NotFound(key)) if key == "mods"
        ));
    }

    #[tokio::test]
    async fn object_url_uses_public_base() {
        let store = DiskStore::new("/unused", "http://localhost:3000/files/");
        let url = store
            .object_url("gallery/1_a.png", Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/files/gallery/1_a.png");
    }
}
