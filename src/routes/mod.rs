// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod auth;
pub mod channel;
pub mod profile;

use crate::error::{AppError, Result};
use crate::middleware::auth::require_auth;
use crate::services::StagedFile;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from the frontend URL and localhost (dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::public_routes())
        .merge(channel::public_routes());

    // Secured routes (access token required)
    let secured_routes = Router::new()
        .merge(auth::secured_routes())
        .merge(profile::routes())
        .merge(channel::secured_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(secured_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

// ─── Multipart helpers shared by register and the media updates ──

/// An uploaded file pulled out of a multipart body.
pub(crate) struct FilePart {
    pub(crate) file_name: String,
    pub(crate) bytes: Vec<u8>,
}

pub(crate) async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map(|t| t.trim().to_string())
        .map_err(|e| AppError::Validation(format!("Malformed multipart field: {}", e)))
}

pub(crate) async fn file_field(field: axum::extract::multipart::Field<'_>) -> Result<FilePart> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart file: {}", e)))?
        .to_vec();
    Ok(FilePart { file_name, bytes })
}

/// Stage a file locally, hand it to the media host, and release the staged
/// copy on every exit path.
pub(crate) async fn upload_staged(state: &AppState, part: &FilePart) -> Result<String> {
    let staged = StagedFile::create(&part.file_name, &part.bytes).await?;
    let stored = state.media.store(staged.path()).await?;
    Ok(stored.url)
}
