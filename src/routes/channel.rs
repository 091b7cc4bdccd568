// SPDX-License-Identifier: MIT

//! Social-graph read queries: channel profile and watch history.
//!
//! Both are composed queries expressed as explicit indexed lookups plus
//! in-memory counting, not a pipeline DSL: resolve the base record, fetch
//! the related records by foreign key, then project the response shape.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::auth::{optional_viewer, CurrentUser};
use crate::models::{ApiResponse, User, Video};
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/channel/{username}", get(get_channel_profile))
}

pub fn secured_routes() -> Router<Arc<AppState>> {
    Router::new().route("/watch-history", get(get_watch_history))
}

// ─── Channel profile ─────────────────────────────────────────────

/// Channel view of a user: profile fields plus subscription counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelProfile {
    full_name: String,
    username: String,
    subscriber_count: u64,
    subscribed_to_count: u64,
    is_subscribed: bool,
    avatar_url: String,
    cover_image_url: Option<String>,
}

/// Resolve a channel by username (case-insensitive) with subscriber counts.
///
/// GET /channel/{username} — public; a valid access token, if supplied,
/// identifies the viewer for the `isSubscribed` flag.
async fn get_channel_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse> {
    let channel = state
        .db
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

    let subscriber_count = state.db.count_subscribers(channel.id).await?;
    let subscribed_to_count = state.db.count_subscriptions(channel.id).await?;

    let is_subscribed = match optional_viewer(&state, &jar, &headers) {
        Some(viewer_id) => state.db.is_subscribed(viewer_id, channel.id).await?,
        None => false,
    };

    let profile = ChannelProfile {
        full_name: channel.full_name,
        username: channel.username,
        subscriber_count,
        subscribed_to_count,
        is_subscribed,
        avatar_url: channel.avatar_url,
        cover_image_url: channel.cover_image_url,
    };

    Ok(ApiResponse::new(
        StatusCode::OK,
        profile,
        "Channel profile fetched",
    ))
}

// ─── Watch history ───────────────────────────────────────────────

/// Owner projection joined onto each watched video.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoOwner {
    full_name: String,
    username: String,
    avatar_url: String,
}

/// One watched video with its owner denormalized in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchHistoryEntry {
    id: Uuid,
    video_file: String,
    thumbnail: String,
    title: String,
    description: String,
    duration: f64,
    views: u64,
    is_published: bool,
    created_at: String,
    owner: VideoOwner,
}

/// The authenticated user's watch history in stored (view) order, each
/// video joined with its owner's public fields.
///
/// GET /watch-history (secured). An empty history is an empty sequence.
async fn get_watch_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    // Fetch all referenced videos concurrently; order is preserved.
    let videos: Vec<Option<Video>> = futures_util::future::try_join_all(
        user.watch_history
            .iter()
            .map(|video_id| state.db.get_video(*video_id)),
    )
    .await?;

    // Owners repeat across a history, so resolve each one once.
    let mut owners: HashMap<Uuid, Option<User>> = HashMap::new();
    let mut history = Vec::new();

    for video in videos.into_iter().flatten() {
        let owner = match owners.get(&video.owner) {
            Some(cached) => cached.clone(),
            None => {
                let fetched = state.db.get_user(video.owner).await?;
                owners.insert(video.owner, fetched.clone());
                fetched
            }
        };

        // A dangling owner reference drops the entry rather than failing
        // the whole query.
        let Some(owner) = owner else {
            tracing::debug!(video_id = %video.id, "Watched video has no owner record");
            continue;
        };

        history.push(WatchHistoryEntry {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            owner: VideoOwner {
                full_name: owner.full_name,
                username: owner.username,
                avatar_url: owner.avatar_url,
            },
        });
    }

    Ok(ApiResponse::new(
        StatusCode::OK,
        history,
        "Watch history fetched",
    ))
}
