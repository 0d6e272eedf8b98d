//! `ObjectStore` over an S3-compatible bucket (Cloudflare R2) using the AWS SDK.

use crate::{
    models::object::{StoredObject, UploadRequest, UploadResult},
    services::object_store::{
        ByteStream, ObjectStore, StorageError, StorageResult, ensure_key_safe,
    },
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    presigning::PresigningConfig,
    primitives::ByteStream as AwsByteStream,
    types::ObjectCannedAcl,
};
use std::{fmt, time::Duration};
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone)]
pub struct R2Config {
    pub endpoint_url: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for R2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct R2Store {
    client: Client,
    bucket: String,
}

impl R2Store {
    /// Build a client for `config`. Path-style addressing is forced since R2
    /// and most self-hosted S3 servers expect it.
    pub async fn connect(config: R2Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "netherious",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        );

        Self {
            client,
            bucket: config.bucket,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for R2Store {
    async fn list_objects(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(StorageError::unavailable)?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    objects.push(StoredObject {
                        key: key.to_string(),
                        size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    });
                }
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!("listed {} objects in bucket {}", objects.len(), self.bucket);
        Ok(objects)
    }

    async fn get_object_stream(&self, key: &str) -> StorageResult<ByteStream> {
        ensure_key_safe(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_key())
                {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::unavailable(err)
                }
            })?;

        let reader = output.body.into_async_read();
        Ok(Box::pin(ReaderStream::new(reader)))
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        ensure_key_safe(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(StorageError::unavailable(err)),
        }
    }

    async fn upload_file(&self, request: UploadRequest) -> StorageResult<UploadResult> {
        let key = request.key();
        ensure_key_safe(&key)?;
        let size_bytes = request.bytes.len() as u64;

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .acl(ObjectCannedAcl::PublicRead)
            .set_content_type(request.content_type)
            .body(AwsByteStream::from(request.bytes))
            .send()
            .await
            .map_err(StorageError::unavailable)?;

        Ok(UploadResult {
            key,
            size_bytes,
            etag: output.e_tag,
        })
    }

    async fn object_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        ensure_key_safe(key)?;
        let presigning = PresigningConfig::expires_in(expires_in).map_err(StorageError::unavailable)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(StorageError::unavailable)?;
        Ok(request.uri().to_string())
    }

    fn name(&self) -> &'static str {
        "r2"
    }
}
