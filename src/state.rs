use crate::services::{
    download_service::DownloadService, gallery_service::GalleryService, object_store::ObjectStore,
};
use std::{sync::Arc, time::Duration};

/// Lifetime of URLs returned by `/api/object-url`.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(5 * 60);

/// Download settings that are not part of any one service.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Key served by `/api/download-mod` when no `path` is given.
    pub default_mod_key: String,
    /// Filename offered for the modpack archive.
    pub archive_name: String,
}

/// Shared state handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub downloads: DownloadService,
    pub gallery: GalleryService,
    pub settings: Arc<DownloadSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        gallery: GalleryService,
        important_key: Option<String>,
        settings: DownloadSettings,
    ) -> Self {
        Self {
            downloads: DownloadService::new(store.clone(), important_key),
            store,
            gallery,
            settings: Arc::new(settings),
        }
    }
}
