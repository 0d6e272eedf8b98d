//! Gallery listing and uploads, plus the current-session accessor.

use crate::{
    auth::SessionUser,
    errors::AppError,
    models::gallery::{GalleryImage, ImageUpload},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQuery {
    pub uploaded_by: Option<String>,
}

/// `GET /api/gallery` — newest first.
pub async fn list_gallery(
    State(state): State<AppState>,
    Query(q): Query<GalleryQuery>,
) -> Result<Json<Vec<GalleryImage>>, AppError> {
    let images = state.gallery.list_images(q.uploaded_by.as_deref()).await?;
    Ok(Json(images))
}

/// `POST /api/gallery` — multipart form with `file` and `description`.
pub async fn upload_gallery_image(
    State(state): State<AppState>,
    user: SessionUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<GalleryImage>), AppError> {
    let mut upload = ImageUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Malformed upload: {}", err)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(format!("Malformed upload: {}", err)))?;
            }
            Some("description") => {
                upload.description = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("Malformed upload: {}", err)))?;
            }
            other => tracing::debug!("ignoring multipart field {:?}", other),
        }
    }

    let image = state.gallery.upload_image(&user, upload).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// `GET /api/session` — the signed-in user, or `null`.
pub async fn current_session(user: Option<SessionUser>) -> Json<Option<SessionUser>> {
    Json(user)
}
