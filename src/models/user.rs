//! User model for storage and API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account stored in the `users` collection.
///
/// `password_hash` and `refresh_token` never leave the store layer in an
/// outward-facing shape; responses use [`PublicUser`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document ID
    pub id: Uuid,
    /// Unique handle, stored lowercase and trimmed
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Argon2 digest of the password
    pub password_hash: String,
    /// Avatar URL on the media host (always set once the user exists)
    pub avatar_url: String,
    /// Optional cover image URL
    pub cover_image_url: Option<String>,
    /// Video IDs in view order; duplicates allowed
    pub watch_history: Vec<Uuid>,
    /// Live refresh token, if any. Absence means no active refresh session.
    pub refresh_token: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
    /// Last mutation timestamp (RFC 3339)
    pub updated_at: String,
}

impl User {
    /// Build a new account record. The username is lowercased here so the
    /// uniqueness check and all later lookups agree on casing.
    pub fn new(
        username: &str,
        email: &str,
        full_name: &str,
        password_hash: String,
        avatar_url: String,
        cover_image_url: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4(),
            username: username.trim().to_lowercase(),
            email: email.trim().to_string(),
            full_name: full_name.trim().to_string(),
            password_hash,
            avatar_url,
            cover_image_url,
            watch_history: Vec::new(),
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Outward representation of a user. Structurally excludes the password
/// hash and refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            cover_image_url: user.cover_image_url.clone(),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}
