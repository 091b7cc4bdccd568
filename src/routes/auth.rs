// SPDX-License-Identifier: MIT

//! Registration, login, logout, token refresh and password change.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::config::CookieOptions;
use crate::error::{AppError, Result};
use crate::middleware::auth::{token_from_request, CurrentUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::{ApiResponse, PublicUser, User};
use crate::routes::{file_field, text_field, upload_staged, FilePart};
use crate::services::{password, TokenKind};
use crate::AppState;

/// Routes that create or refresh a session (no auth required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refreshAccessToken", post(refresh_access_token))
}

/// Routes that operate on an authenticated session.
pub fn secured_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-current-password", post(change_password))
}

// ─── Cookies ─────────────────────────────────────────────────────

/// Build a session cookie with the configured attributes.
fn session_cookie(name: &'static str, value: String, opts: &CookieOptions) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(opts.secure);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

/// Add both token cookies to the jar.
fn with_token_cookies(
    jar: CookieJar,
    access: &str,
    refresh: &str,
    opts: &CookieOptions,
) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access.to_string(), opts))
        .add(session_cookie(REFRESH_COOKIE, refresh.to_string(), opts))
}

/// Remove both token cookies, using the same attributes they were set with.
fn without_token_cookies(jar: CookieJar, opts: &CookieOptions) -> CookieJar {
    jar.remove(session_cookie(ACCESS_COOKIE, String::new(), opts))
        .remove(session_cookie(REFRESH_COOKIE, String::new(), opts))
}

// ─── Register ────────────────────────────────────────────────────

/// Text fields of the registration form, trimmed during extraction and
/// checked declaratively in one place.
#[derive(Debug, Default, Validate)]
struct RegisterForm {
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(
        length(min = 1, message = "email is required"),
        email(message = "email must be valid")
    )]
    email: String,
    #[validate(length(min = 1, message = "fullName is required"))]
    full_name: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

/// Register a new account.
///
/// POST /register (multipart: username, email, fullName, password,
/// avatar file required, coverImage file optional)
async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = RegisterForm::default();
    let mut avatar: Option<FilePart> = None;
    let mut cover: Option<FilePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        match name.as_str() {
            "username" => form.username = text_field(field).await?,
            "email" => form.email = text_field(field).await?,
            "fullName" => form.full_name = text_field(field).await?,
            "password" => form.password = text_field(field).await?,
            "avatar" => avatar = Some(file_field(field).await?),
            "coverImage" => cover = Some(file_field(field).await?),
            _ => {}
        }
    }

    form.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Uniqueness: username is compared in its lowercase stored form.
    if state
        .db
        .get_user_by_username(&form.username)
        .await?
        .is_some()
        || state.db.get_user_by_email(&form.email).await?.is_some()
    {
        return Err(AppError::Conflict(
            "User with username or email already exists".to_string(),
        ));
    }

    // Required before anything reaches the media host.
    let avatar = avatar.ok_or_else(|| AppError::Validation("Avatar file is required".to_string()))?;

    let avatar_url = upload_staged(&state, &avatar).await?;

    // A cover failure is non-fatal: the account is created without one.
    let cover_url = match &cover {
        None => None,
        Some(part) => match upload_staged(&state, part).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "Cover image upload failed, continuing without");
                None
            }
        },
    };

    let password_hash = password::hash_password(&form.password)?;

    let user = User::new(
        &form.username,
        &form.email,
        &form.full_name,
        password_hash,
        avatar_url,
        cover_url,
    );
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    // The response is derived from the record just written; no re-read.
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        PublicUser::from(&user),
        "User registered successfully",
    ))
}

// ─── Login ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: Option<String>,
    email: Option<String>,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: PublicUser,
    access_token: String,
    refresh_token: String,
}

/// Log in with username or email plus password.
///
/// POST /login
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let username = body.username.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let email = body.email.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if username.is_none() && email.is_none() {
        return Err(AppError::Validation(
            "username or email is required".to_string(),
        ));
    }
    if body.password.trim().is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }

    let user = match username {
        Some(name) => state.db.get_user_by_username(name).await?,
        None => None,
    };
    let user = match (user, email) {
        (Some(user), _) => Some(user),
        (None, Some(addr)) => state.db.get_user_by_email(addr).await?,
        (None, None) => None,
    };
    let user = user.ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !password::verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    let access_token = state.tokens.issue_access(user.id)?;
    let refresh_token = state.tokens.issue_refresh(user.id)?;

    // Overwrites any prior value: at most one live refresh token per user.
    state
        .db
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = with_token_cookies(jar, &access_token, &refresh_token, &state.config.cookies);
    let data = SessionData {
        user: PublicUser::from(&user),
        access_token,
        refresh_token,
    };

    Ok((
        jar,
        ApiResponse::new(StatusCode::OK, data, "User logged in successfully"),
    ))
}

// ─── Logout ──────────────────────────────────────────────────────

/// Clear the stored refresh token and both cookies. Idempotent.
///
/// POST /logout (secured)
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    state.db.set_refresh_token(user.id, None).await?;

    tracing::info!(user_id = %user.id, "User logged out");

    let jar = without_token_cookies(jar, &state.config.cookies);
    Ok((
        jar,
        ApiResponse::new(
            StatusCode::OK,
            serde_json::json!({}),
            "User logged out successfully",
        ),
    ))
}

// ─── Refresh ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairData {
    access_token: String,
    refresh_token: String,
}

/// Rotate the access/refresh pair.
///
/// POST /refreshAccessToken (refresh token from cookie or body)
async fn refresh_access_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse> {
    let incoming = token_from_request(&jar, &headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| AppError::Auth("Refresh token is required".to_string()))?;

    let user_id = state.tokens.verify(&incoming, TokenKind::Refresh)?;

    let access_token = state.tokens.issue_access(user_id)?;
    let refresh_token = state.tokens.issue_refresh(user_id)?;

    // The swap only succeeds if the incoming token is exactly the stored
    // one; a superseded token (or a concurrent racer) fails here.
    let rotated = state
        .db
        .rotate_refresh_token(user_id, &incoming, &refresh_token)
        .await?;
    if !rotated {
        return Err(AppError::Auth(
            "Refresh token is expired or already used".to_string(),
        ));
    }

    tracing::info!(user_id = %user_id, "Refresh token rotated");

    let jar = with_token_cookies(jar, &access_token, &refresh_token, &state.config.cookies);
    let data = TokenPairData {
        access_token,
        refresh_token,
    };

    Ok((
        jar,
        ApiResponse::new(StatusCode::OK, data, "Access token refreshed"),
    ))
}

// ─── Change password ─────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct ChangePasswordRequest {
    /// Current password
    #[validate(length(min = 1, message = "password is required"))]
    #[serde(default)]
    password: String,
    /// Replacement password
    #[validate(length(min = 1, message = "newPassword is required"))]
    #[serde(rename = "newPassword", default)]
    new_password: String,
}

/// Change the current user's password. Existing refresh tokens stay valid.
///
/// POST /change-current-password (secured)
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if !password::verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Auth("Old password is incorrect".to_string()));
    }

    let new_hash = password::hash_password(&body.new_password)?;
    state.db.set_password_hash(user.id, &new_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::new(
        StatusCode::OK,
        serde_json::json!({}),
        "Password changed successfully",
    ))
}
