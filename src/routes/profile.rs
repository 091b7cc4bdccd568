// SPDX-License-Identifier: MIT

//! Profile and media-slot updates for the authenticated user.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::{ApiResponse, PublicUser};
use crate::routes::{file_field, upload_staged, FilePart};
use crate::AppState;

/// All profile routes are secured; the auth layer is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getUserDetails", get(get_user_details))
        .route("/updateUserProfile", post(update_profile))
        .route("/updateUserAvatar", post(update_avatar))
        .route("/updateUserCoverImage", post(update_cover_image))
}

/// Return the identity the auth middleware already resolved.
///
/// GET /getUserDetails
async fn get_user_details(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(&user),
        "User details fetched",
    ))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "fullName is required"))]
    #[serde(rename = "fullName", default)]
    full_name: String,
    #[validate(
        length(min = 1, message = "email is required"),
        email(message = "email must be valid")
    )]
    #[serde(default)]
    email: String,
}

/// Update display name and email.
///
/// POST /updateUserProfile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    let body = UpdateProfileRequest {
        full_name: body.full_name.trim().to_string(),
        email: body.email.trim().to_string(),
    };
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state
        .db
        .update_profile(user.id, &body.full_name, &body.email)
        .await?
        .ok_or_else(|| AppError::Auth("Unknown user".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(&updated),
        "Profile updated successfully",
    ))
}

/// Pull a single named file out of a multipart body.
async fn single_file(mut multipart: Multipart, field_name: &str) -> Result<FilePart> {
    let mut file: Option<FilePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(field_name) {
            file = Some(file_field(field).await?);
        }
    }

    file.ok_or_else(|| AppError::Validation(format!("{} file is required", field_name)))
}

/// Replace the avatar.
///
/// POST /updateUserAvatar (multipart field `avatar`)
async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let file = single_file(multipart, "avatar").await?;
    let url = upload_staged(&state, &file).await?;

    let updated = state
        .db
        .set_avatar_url(user.id, &url)
        .await?
        .ok_or_else(|| AppError::Auth("Unknown user".to_string()))?;

    tracing::info!(user_id = %user.id, "Avatar updated");

    Ok(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(&updated),
        "Avatar updated successfully",
    ))
}

/// Replace the cover image.
///
/// POST /updateUserCoverImage (multipart field `coverImage`)
async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let file = single_file(multipart, "coverImage").await?;
    let url = upload_staged(&state, &file).await?;

    let updated = state
        .db
        .set_cover_image_url(user.id, &url)
        .await?
        .ok_or_else(|| AppError::Auth("Unknown user".to_string()))?;

    tracing::info!(user_id = %user.id, "Cover image updated");

    Ok(ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(&updated),
        "Cover image updated successfully",
    ))
}
