//! Bucket browsing: prefix listings, signed URLs and a streaming file proxy.

use crate::{
    errors::AppError,
    models::object::{StoredObject, content_type_for_key},
    state::{AppState, SIGNED_URL_TTL},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub prefix: String,
    pub count: usize,
    pub objects: Vec<StoredObject>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectUrlQuery {
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUrlResponse {
    pub url: String,
    /// Seconds until the URL stops working.
    pub expires_in: u64,
}

/// `GET /api/files?prefix=` — objects under a prefix, e.g. `resourcepacks/`.
pub async fn list_files(
    State(state): State<AppState>,
    Query(q): Query<ListFilesQuery>,
) -> Result<Json<FileListing>, AppError> {
    let prefix = q.prefix.unwrap_or_default();
    let objects = state
        .store
        .list_objects(Some(prefix.as_str()).filter(|p| !p.is_empty()))
        .await?;

    Ok(Json(FileListing {
        prefix,
        count: objects.len(),
        objects,
    }))
}

/// `GET /api/object-url?key=` — short-lived read URL for one object.
pub async fn object_url(
    State(state): State<AppState>,
    Query(q): Query<ObjectUrlQuery>,
) -> Result<Json<ObjectUrlResponse>, AppError> {
    if !state.store.object_exists(&q.key).await? {
        return Err(AppError::not_found("File not found"));
    }

    let url = state.store.object_url(&q.key, SIGNED_URL_TTL).await?;
    Ok(Json(ObjectUrlResponse {
        url,
        expires_in: SIGNED_URL_TTL.as_secs(),
    }))
}

/// `GET /files/{*key}` — stream an object body without buffering it.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let stream = state.store.get_object_stream(&key).await?;

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_key(&key)),
    );
    Ok(response)
}
