//! HTTP handlers for the mod and modpack downloads.
//! Both respond with fully buffered attachments so `Content-Length` is
//! always exact.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DownloadModQuery {
    pub path: Option<String>,
}

/// `GET /api/download-mod?path=<objectKey>`
///
/// Without `path` the configured default mod is served.
pub async fn download_mod(
    State(state): State<AppState>,
    Query(q): Query<DownloadModQuery>,
) -> Result<Response, AppError> {
    let key = q
        .path
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.settings.default_mod_key.clone());

    let file = state.downloads.fetch_file(&key).await.map_err(|err| {
        tracing::warn!("download of {} failed: {}", key, err);
        AppError::from(err)
    })?;

    tracing::info!("serving {} ({} bytes)", key, file.bytes.len());
    Ok(attachment_response(
        file.bytes,
        "application/java-archive",
        &file.file_name,
    ))
}

/// `GET /api/download-modpack` — every object in the bucket as one ZIP.
pub async fn download_modpack(State(state): State<AppState>) -> Result<Response, AppError> {
    let archive = state.downloads.build_modpack().await.map_err(|err| {
        tracing::warn!("modpack build failed: {}", err);
        AppError::from(err)
    })?;

    if archive.added < archive.listed {
        tracing::warn!(
            "modpack is missing {} of {} objects",
            archive.listed - archive.added,
            archive.listed
        );
    }

    Ok(attachment_response(
        Bytes::from(archive.bytes),
        "application/zip",
        &state.settings.archive_name,
    ))
}

/// Binary response with attachment disposition and explicit length.
pub(crate) fn attachment_response(bytes: Bytes, content_type: &'static str, file_name: &str) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    set_attachment_headers(response.headers_mut(), content_type, file_name, length);
    response
}

fn set_attachment_headers(
    headers: &mut HeaderMap,
    content_type: &'static str,
    file_name: &str,
    length: usize,
) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let disposition = format!(
        "attachment; filename=\"{}\"",
        disposition_file_name(file_name)
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
}

/// Strip characters that would break the quoted `filename` parameter.
fn disposition_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_headers_are_complete() {
        let resp = attachment_response(
            Bytes::from_static(b"jar"),
            "application/java-archive",
            "create-1.20.1-6.0.4.jar",
        );
        let headers = resp.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/java-archive");
        assert_eq!(headers[header::CONTENT_LENGTH], "3");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"create-1.20.1-6.0.4.jar\""
        );
    }

    #[test]
    fn quotes_and_controls_are_replaced() {
        assert_eq!(disposition_file_name("a\"b\\c\nd.jar"), "a_b_c_d.jar");
        assert_eq!(disposition_file_name(""), "download");
    }
}
