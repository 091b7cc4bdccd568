//! Document store layer.
//!
//! [`Database`] is the seam between the flows and the storage engine: a
//! production Firestore implementation and an in-memory implementation used
//! by tests and local development.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{User, Video};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const VIDEOS: &str = "videos";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Typed operations over the document store.
///
/// Per-user mutations touch exactly one record; the only multi-step write,
/// refresh-token rotation, is a compare-and-swap so concurrent refreshes
/// with the same stale token cannot both win.
#[async_trait]
pub trait Database: Send + Sync {
    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Get a user by username. Matching is case-insensitive: the input is
    /// lowercased to the stored form before lookup.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Get a user by email (exact match).
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Persist a new user record.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Overwrite the stored refresh token. `None` clears it (logout).
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError>;

    /// Atomically replace the refresh token iff the stored value equals
    /// `expected`. Returns `false` on mismatch (including an absent token
    /// or an unknown user) without writing anything.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        new: &str,
    ) -> Result<bool, AppError>;

    /// Replace the stored password digest.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;

    /// Update display name and email, returning the updated record.
    /// `None` if the user no longer exists.
    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Replace the avatar URL, returning the updated record.
    async fn set_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>, AppError>;

    /// Replace the cover image URL, returning the updated record.
    async fn set_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>, AppError>;

    // ─── Video Operations (read-only) ────────────────────────────

    /// Get a video by ID.
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError>;

    // ─── Subscription Operations (read-only) ─────────────────────

    /// Count edges where `channel` is the target.
    async fn count_subscribers(&self, channel: Uuid) -> Result<u64, AppError>;

    /// Count edges where `subscriber` is the source.
    async fn count_subscriptions(&self, subscriber: Uuid) -> Result<u64, AppError>;

    /// Whether the edge `(subscriber, channel)` exists.
    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> Result<bool, AppError>;
}
