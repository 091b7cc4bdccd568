// SPDX-License-Identifier: MIT

//! Vidstream: user-account backend for a video-sharing platform.
//!
//! This crate provides registration, credential login with rotating
//! access/refresh token pairs, profile and media-slot updates, and the
//! channel-profile / watch-history read queries.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::Database;
use services::{MediaStore, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Database>,
    pub media: Arc<dyn MediaStore>,
    pub tokens: TokenService,
}
