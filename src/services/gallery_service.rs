//! GalleryService — validates image uploads, stores them in the bucket and
//! records their metadata in SQLite, holding each user to a fixed quota.

use crate::{
    auth::SessionUser,
    models::{
        gallery::{GalleryImage, ImageUpload, MAX_DESCRIPTION_CHARS, MAX_IMAGES_PER_USER},
        object::UploadRequest,
    },
    services::object_store::{ObjectStore, StorageError},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const GALLERY_FOLDER: &str = "gallery";
const ALLOWED_CONTENT_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{0}")]
    Validation(String),
    #[error("upload limit of {limit} images reached")]
    QuotaExceeded { limit: i64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

#[derive(Clone)]
pub struct GalleryService {
    pub db: Arc<SqlitePool>,
    store: Arc<dyn ObjectStore>,

    /// Prefix that turns an object key into a publicly reachable URL.
    public_base_url: String,
}

impl GalleryService {
    pub fn new(
        db: Arc<SqlitePool>,
        store: Arc<dyn ObjectStore>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            store,
            public_base_url: public_base_url.into(),
        }
    }

    /// All gallery records, newest first, optionally limited to one uploader.
    pub async fn list_images(&self, uploaded_by: Option<&str>) -> GalleryResult<Vec<GalleryImage>> {
        let images = match uploaded_by {
            Some(uid) => {
                sqlx::query_as::<_, GalleryImage>(
                    "SELECT id, image_url, description, uploaded_by, uploaded_at
                     FROM gallery_images WHERE uploaded_by = ?
                     ORDER BY uploaded_at DESC",
                )
                .bind(uid)
                .fetch_all(&*self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, GalleryImage>(
                    "SELECT id, image_url, description, uploaded_by, uploaded_at
                     FROM gallery_images ORDER BY uploaded_at DESC",
                )
                .fetch_all(&*self.db)
                .await?
            }
        };
        Ok(images)
    }

    pub async fn count_for_uploader(&self, uid: &str) -> GalleryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM gallery_images WHERE uploaded_by = ?",
        )
        .bind(uid)
        .fetch_one(&*self.db)
        .await?;
        Ok(count)
    }

    /// Validate, store and record one image for `user`.
    ///
    /// The quota is checked before touching the bucket and again inside the
    /// insert itself, so concurrent uploads cannot push a user past the limit.
    /// If the second check fails the uploaded object is left behind.
    pub async fn upload_image(
        &self,
        user: &SessionUser,
        upload: ImageUpload,
    ) -> GalleryResult<GalleryImage> {
        let content_type = validate_upload(&upload)?;
        let description = upload.description.trim().to_string();

        if self.count_for_uploader(&user.uid).await? >= MAX_IMAGES_PER_USER {
            return Err(GalleryError::QuotaExceeded {
                limit: MAX_IMAGES_PER_USER,
            });
        }

        let uploaded_at = Utc::now();
        let file_name = format!(
            "{}_{}",
            uploaded_at.timestamp_millis(),
            sanitize_file_name(upload.file_name.as_deref().unwrap_or("image"))
        );
        let stored = self
            .store
            .upload_file(UploadRequest {
                bytes: upload.bytes,
                file_name,
                folder: GALLERY_FOLDER.to_string(),
                content_type: Some(content_type.to_string()),
            })
            .await?;

        let image = GalleryImage {
            id: Uuid::new_v4(),
            image_url: self.public_url(&stored.key),
            description,
            uploaded_by: user.uid.clone(),
            uploaded_at,
        };

        if !self.insert_within_quota(&image).await? {
            warn!(
                "quota reached for {} during upload; object {} left orphaned",
                user.uid, stored.key
            );
            return Err(GalleryError::QuotaExceeded {
                limit: MAX_IMAGES_PER_USER,
            });
        }

        info!(
            "stored gallery image {} for {} ({} bytes)",
            stored.key, user.uid, stored.size_bytes
        );
        Ok(image)
    }

    /// Insert `image` unless its uploader already holds the maximum.
    ///
    /// The count and the insert are one statement, so two uploads racing
    /// past the pre-check cannot both land a 4th row. Returns whether the
    /// row was written.
    pub async fn insert_within_quota(&self, image: &GalleryImage) -> GalleryResult<bool> {
        let inserted = sqlx::query(
            "INSERT INTO gallery_images (id, image_url, description, uploaded_by, uploaded_at)
             SELECT ?, ?, ?, ?, ?
             WHERE (SELECT COUNT(*) FROM gallery_images WHERE uploaded_by = ?) < ?",
        )
        .bind(image.id)
        .bind(&image.image_url)
        .bind(&image.description)
        .bind(&image.uploaded_by)
        .bind(image.uploaded_at)
        .bind(&image.uploaded_by)
        .bind(MAX_IMAGES_PER_USER)
        .execute(&*self.db)
        .await?;
        Ok(inserted.rows_affected() == 1)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

/// Check the upload against the form rules and return its content type.
fn validate_upload(upload: &ImageUpload) -> GalleryResult<&'static str> {
    if upload.bytes.is_empty() {
        return Err(GalleryError::Validation("No file selected".into()));
    }

    let content_type = upload
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());
    let content_type = content_type
        .as_deref()
        .and_then(|ct| {
            ALLOWED_CONTENT_TYPES
                .iter()
                .copied()
                .find(|allowed| *allowed == ct)
        })
        .ok_or_else(|| GalleryError::Validation("Only PNG and JPEG images are allowed".into()))?;

    if upload.description.trim().chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(GalleryError::Validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }

    Ok(content_type)
}

/// Keep the final path segment and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::object::{StoredObject, UploadResult},
        services::{
            disk_store::DiskStore,
            object_store::{ByteStream, StorageResult},
        },
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn memory_pool() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        Arc::new(pool)
    }

    fn record(uid: &str, n: u32) -> GalleryImage {
        GalleryImage {
            id: Uuid::new_v4(),
            image_url: format!("http://cdn.test/gallery/{}_{}.png", uid, n),
            description: String::new(),
            uploaded_by: uid.to_string(),
            uploaded_at: Utc::now(),
        }
    }

    /// Disk store that, while an upload is in flight, lets another client
    /// fill the uploader's quota, as a concurrent request would.
    struct RacingStore {
        inner: DiskStore,
        db: Arc<SqlitePool>,
        rival_uid: String,
    }

    #[async_trait]
    impl ObjectStore for RacingStore {
        async fn list_objects(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
            self.inner.list_objects(prefix).await
        }

        async fn get_object_stream(&self, key: &str) -> StorageResult<ByteStream> {
            self.inner.get_object_stream(key).await
        }

        async fn object_exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.object_exists(key).await
        }

        async fn upload_file(&self, request: UploadRequest) -> StorageResult<UploadResult> {
            let result = self.inner.upload_file(request).await?;
            let rivals = GalleryService::new(self.db.clone(), Arc::new(self.inner.clone()), "");
            for n in 0..MAX_IMAGES_PER_USER as u32 {
                rivals
                    .insert_within_quota(&record(&self.rival_uid, n))
                    .await
                    .map_err(|err| StorageError::unavailable(std::io::Error::other(err.to_string())))?;
            }
            Ok(result)
        }

        async fn object_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
            self.inner.object_url(key, expires_in).await
        }

        fn name(&self) -> &'static str {
            "racing"
        }
    }

    fn user(uid: &str) -> SessionUser {
        SessionUser {
            uid: uid.to_string(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn insert_stops_at_quota() {
        let dir = TempDir::new().unwrap();
        let db = memory_pool().await;
        let svc = GalleryService::new(db, Arc::new(DiskStore::new(dir.path(), "")), "http://cdn.test");

        for n in 0..MAX_IMAGES_PER_USER as u32 {
            assert!(svc.insert_within_quota(&record("steve", n)).await.unwrap());
        }
        assert!(!svc.insert_within_quota(&record("steve", 99)).await.unwrap());
        assert_eq!(svc.count_for_uploader("steve").await.unwrap(), MAX_IMAGES_PER_USER);

        assert!(svc.insert_within_quota(&record("alex", 0)).await.unwrap());
    }

    #[tokio::test]
    async fn quota_filled_mid_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let db = memory_pool().await;
        let store = RacingStore {
            inner: DiskStore::new(dir.path(), "http://localhost/files"),
            db: db.clone(),
            rival_uid: "steve".into(),
        };
        let svc = GalleryService::new(db, Arc::new(store), "http://cdn.test");

        let err = svc
            .upload_image(&user("steve"), upload("image/png", "late"))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::QuotaExceeded { limit: MAX_IMAGES_PER_USER }));
        assert_eq!(svc.count_for_uploader("steve").await.unwrap(), MAX_IMAGES_PER_USER);
        assert!(
            svc.list_images(Some("steve"))
                .await
                .unwrap()
                .iter()
                .all(|image| image.description.is_empty())
        );
    }

    fn upload(content_type: &str, description: &str) -> ImageUpload {
        ImageUpload {
            file_name: Some("shot.png".into()),
            content_type: Some(content_type.into()),
            bytes: Bytes::from_static(b"\x89PNG"),
            description: description.into(),
        }
    }

    #[test]
    fn accepts_png_and_jpeg() {
        assert_eq!(validate_upload(&upload("image/png", "spawn")).unwrap(), "image/png");
        assert_eq!(
            validate_upload(&upload("IMAGE/JPEG; charset=binary", "")).unwrap(),
            "image/jpeg"
        );
    }

    #[test]
    fn rejects_other_types() {
        assert!(matches!(
            validate_upload(&upload("image/gif", "spawn")),
            Err(GalleryError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_file() {
        let empty = ImageUpload {
            bytes: Bytes::new(),
            ..upload("image/png", "")
        };
        assert!(matches!(validate_upload(&empty), Err(GalleryError::Validation(msg)) if msg == "No file selected"));
    }

    #[test]
    fn description_limit_counts_characters() {
        let exactly = "é".repeat(MAX_DESCRIPTION_CHARS);
        assert!(validate_upload(&upload("image/png", &exactly)).is_ok());

        let over = "a".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(matches!(
            validate_upload(&upload("image/png", &over)),
            Err(GalleryError::Validation(_))
        ));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("my shot (1).png"), "my_shot__1_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\pics\\base.jpg"), "base.jpg");
        assert_eq!(sanitize_file_name(".."), "image");
    }
}
