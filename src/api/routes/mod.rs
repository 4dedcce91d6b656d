//! API route modules.

pub mod conversations;
pub mod progress;
pub mod uploads;

use crate::api::error::ApiError;
use crate::auth::{self, Authenticator, TokenAuthenticator, UserId};
use axum::http::{header, HeaderMap};

/// Resolves the caller from the `Authorization: Bearer <token>` header.
pub fn require_user(auth: &TokenAuthenticator, headers: &HeaderMap) -> Result<UserId, ApiError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let token = auth::bearer_token(header_value)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    auth.resolve(token)
        .ok_or_else(|| ApiError::unauthorized("Invalid API token"))
}
