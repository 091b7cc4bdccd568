// SPDX-License-Identifier: MIT

//! Access-token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::services::TokenKind;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The authenticated user, resolved once per request and attached as a
/// request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Pull a token from the named cookie, falling back to a Bearer header.
pub fn token_from_request(jar: &CookieJar, headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Middleware guarding secured routes.
///
/// Verifies the access token, then confirms the identity still exists in
/// the store. A token for a deleted user is an auth failure, not a crash.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_request(&jar, request.headers(), ACCESS_COOKIE)
        .ok_or_else(|| AppError::Auth("Missing access token".to_string()))?;

    let user_id = state.tokens.verify(&token, TokenKind::Access)?;

    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::Auth("Unknown user".to_string()))?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Resolve an optional viewer identity for public routes.
///
/// Invalid or absent credentials mean "anonymous", never an error.
pub fn optional_viewer(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Option<uuid::Uuid> {
    let token = token_from_request(jar, headers, ACCESS_COOKIE)?;
    state.tokens.verify(&token, TokenKind::Access).ok()
}
