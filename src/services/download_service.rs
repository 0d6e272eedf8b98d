//! DownloadService — resolves single-file downloads and assembles the
//! modpack archive from whatever the bucket currently holds.
//!
//! Nothing is cached between calls: every modpack request lists the bucket
//! and re-reads every object, one at a time.

use crate::{
    models::object::file_name_from_key,
    services::{
        archive::ModpackArchive,
        buffer::collect_stream,
        object_store::{ObjectStore, StorageError},
    },
};
use bytes::Bytes;
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("bucket contains no objects")]
    EmptyBucket,
    #[error("none of the {listed} listed objects could be added to the archive")]
    NothingAdded { listed: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A fully buffered file ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Outcome of a modpack build.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub bytes: Vec<u8>,
    pub listed: usize,
    pub added: usize,
}

#[derive(Clone)]
pub struct DownloadService {
    store: Arc<dyn ObjectStore>,

    /// Key whose absence is worth a warning when building the modpack.
    important_key: Option<String>,
}

impl DownloadService {
    pub fn new(store: Arc<dyn ObjectStore>, important_key: Option<String>) -> Self {
        Self {
            store,
            important_key,
        }
    }

    /// Fetch one object fully into memory.
    ///
    /// Existence is checked first so a missing key never opens a stream.
    pub async fn fetch_file(&self, key: &str) -> Result<DownloadedFile, DownloadError> {
        if !self.store.object_exists(key).await? {
            return Err(DownloadError::NotFound(key.to_string()));
        }

        let stream = self.store.get_object_stream(key).await?;
        let bytes = collect_stream(stream).await?;
        debug!("buffered {} bytes for {}", bytes.len(), key);

        Ok(DownloadedFile {
            file_name: file_name_from_key(key).to_string(),
            bytes,
        })
    }

    /// Build a ZIP of every object in the bucket.
    ///
    /// Objects are fetched sequentially. A failed fetch is logged and the
    /// object skipped; the build only fails when the listing is empty or
    /// nothing at all could be added.
    pub async fn build_modpack(&self) -> Result<BuiltArchive, DownloadError> {
        self.probe_important_key().await;

        let objects = self.store.list_objects(None).await?;
        if objects.is_empty() {
            return Err(DownloadError::EmptyBucket);
        }
        info!("building modpack from {} objects", objects.len());

        let mut archive = ModpackArchive::new();
        for object in &objects {
            let data = match self.read_object(&object.key).await {
                Ok(data) => data,
                Err(err) => {
                    warn!("skipping {} in modpack: {}", object.key, err);
                    continue;
                }
            };
            if let Err(err) = archive.add_file(&object.key, &data) {
                warn!("skipping {} in modpack: {}", object.key, err);
                continue;
            }
            debug!("added {} ({} bytes) to modpack", object.key, data.len());
        }

        let added = archive.len();
        if added == 0 {
            return Err(DownloadError::NothingAdded {
                listed: objects.len(),
            });
        }

        let bytes = archive.finish()?;
        info!(
            "modpack ready: {} of {} objects, {} bytes",
            added,
            objects.len(),
            bytes.len()
        );

        Ok(BuiltArchive {
            bytes,
            listed: objects.len(),
            added,
        })
    }

    async fn read_object(&self, key: &str) -> Result<Bytes, DownloadError> {
        let stream = self.store.get_object_stream(key).await?;
        Ok(collect_stream(stream).await?)
    }

    /// Warn-only check; never aborts the build.
    async fn probe_important_key(&self) {
        let Some(key) = self.important_key.as_deref() else {
            return;
        };
        match self.store.object_exists(key).await {
            Ok(true) => debug!("important object {} present", key),
            Ok(false) => warn!("important object {} is missing from the bucket", key),
            Err(err) => warn!("could not check important object {}: {}", key, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::object::{StoredObject, UploadRequest, UploadResult};
    use crate::services::object_store::{ByteStream, StorageResult};
    use async_trait::async_trait;
    use futures::stream;
    use std::{
        collections::{BTreeMap, BTreeSet},
        io::{Cursor, Read},
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    /// In-memory store whose reads fail for the keys in `broken`.
    #[derive(Default)]
    struct MemoryStore {
        objects: BTreeMap<String, Vec<u8>>,
        broken: BTreeSet<String>,
        streams_opened: AtomicUsize,
    }

    impl MemoryStore {
        fn with(objects: &[(&str, &[u8])]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_vec()))
                    .collect(),
                ..Self::default()
            }
        }

        fn break_key(mut self, key: &str) -> Self {
            self.broken.insert(key.to_string());
            self
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn list_objects(&self, _prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
            Ok(self
                .objects
                .iter()
                .map(|(key, data)| StoredObject {
                    key: key.clone(),
                    size_bytes: data.len() as u64,
                })
                .collect())
        }

        async fn get_object_stream(&self, key: &str) -> StorageResult<ByteStream> {
            self.streams_opened.fetch_add(1, Ordering::SeqCst);
            if self.broken.contains(key) {
                return Err(StorageError::unavailable(io::Error::other("connection reset")));
            }
            let data = self
                .objects
                .get(key)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
            let chunks: Vec<io::Result<Bytes>> = data
                .chunks(4)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }

        async fn object_exists(&self, key: &str) -> StorageResult<bool> {
            Ok(self.objects.contains_key(key))
        }

        async fn upload_file(&self, _request: UploadRequest) -> StorageResult<UploadResult> {
            unimplemented!("read-only test store")
        }

        async fn object_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
            Ok(format!("mem://{}", key))
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn service(store: MemoryStore) -> (DownloadService, Arc<MemoryStore>) {
        let store = Arc::new(store);
        let important = Some("mods/create-1.20.1-6.0.4.jar".to_string());
        (DownloadService::new(store.clone(), important), store)
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        zip.file_names().map(str::to_string).collect::<BTreeSet<_>>().into_iter().collect()
    }

    #[tokio::test]
    async fn fetch_file_buffers_whole_object() {
        let (svc, _) = service(MemoryStore::with(&[("mods/sodium.jar", b"0123456789".as_slice())]));
        let file = svc.fetch_file("mods/sodium.jar").await.unwrap();
        assert_eq!(file.file_name, "sodium.jar");
        assert_eq!(&file.bytes[..], b"0123456789");
    }

    #[tokio::test]
    async fn fetch_file_missing_never_opens_stream() {
        let (svc, store) = service(MemoryStore::with(&[]));
        let err = svc.fetch_file("mods/nope.jar").await.unwrap_err();
        assert!(matches!(err, DownloadError::NotFound(key) if key == "mods/nope.jar"));
        assert_eq!(store.streams_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn modpack_contains_every_object() {
        let (svc, _) = service(MemoryStore::with(&[
            ("mods/a.jar", b"aaaa-aaaa".as_slice()),
            ("config/a.toml", b"x = 1".as_slice()),
        ]));
        let built = svc.build_modpack().await.unwrap();
        assert_eq!((built.listed, built.added), (2, 2));
        assert_eq!(entry_names(&built.bytes), ["config/a.toml", "mods/a.jar"]);

        let mut zip = zip::ZipArchive::new(Cursor::new(built.bytes)).unwrap();
        let mut content = String::new();
        zip.by_name("config/a.toml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "x = 1");
    }

    #[tokio::test]
    async fn modpack_skips_failed_objects() {
        let store = MemoryStore::with(&[("mods/a.jar", b"a".as_slice()), ("mods/b.jar", b"b".as_slice())])
            .break_key("mods/a.jar");
        let (svc, _) = service(store);

        let built = svc.build_modpack().await.unwrap();
        assert_eq!((built.listed, built.added), (2, 1));
        assert_eq!(entry_names(&built.bytes), ["mods/b.jar"]);
    }

    #[tokio::test]
    async fn empty_bucket_is_reported() {
        let (svc, store) = service(MemoryStore::with(&[]));
        assert!(matches!(
            svc.build_modpack().await,
            Err(DownloadError::EmptyBucket)
        ));
        assert_eq!(store.streams_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_fetches_failing_is_nothing_added() {
        let store = MemoryStore::with(&[("mods/a.jar", b"a".as_slice()), ("mods/b.jar", b"b".as_slice())])
            .break_key("mods/a.jar")
            .break_key("mods/b.jar");
        let (svc, _) = service(store);
        assert!(matches!(
            svc.build_modpack().await,
            Err(DownloadError::NothingAdded { listed: 2 })
        ));
    }

    #[tokio::test]
    async fn unchanged_bucket_gives_identical_archives() {
        let (svc, _) = service(MemoryStore::with(&[
            ("mods/a.jar", b"alpha".as_slice()),
            ("mods/b.jar", b"beta".as_slice()),
        ]));
        let first = svc.build_modpack().await.unwrap();
        let second = svc.build_modpack().await.unwrap();
        assert_eq!(first.bytes, second.bytes);
    }
}
