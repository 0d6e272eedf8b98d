//! Session identity forwarded by the OAuth gateway in front of the API.
//!
//! The gateway terminates the Google sign-in flow and passes the signed-in
//! user along as `x-auth-*` headers. A request without `x-auth-uid` has no
//! session.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, request::Parts},
};
use serde::{Deserialize, Serialize};

pub const UID_HEADER: &str = "x-auth-uid";
pub const NAME_HEADER: &str = "x-auth-name";
pub const EMAIL_HEADER: &str = "x-auth-email";
pub const PICTURE_HEADER: &str = "x-auth-picture";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl SessionUser {
    /// Read the session from request headers, if one is present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let uid = header_str(headers, UID_HEADER)?;
        Some(Self {
            uid,
            display_name: header_str(headers, NAME_HEADER),
            email: header_str(headers, EMAIL_HEADER),
            photo_url: header_str(headers, PICTURE_HEADER),
        })
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("You must be signed in"))
    }
}

impl<S> OptionalFromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
