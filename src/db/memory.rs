// SPDX-License-Identifier: MIT

//! In-memory implementation of the [`Database`] trait.
//!
//! Used by the test suite and for local development without a Firestore
//! emulator. All state sits behind one `RwLock`, which gives the same
//! per-record atomicity the flows rely on: the refresh-token
//! compare-and-swap runs entirely under the write lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::Database;
use crate::error::AppError;
use crate::models::{Subscription, User, Video};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    videos: HashMap<Uuid, Video>,
    subscriptions: Vec<Subscription>,
}

/// In-memory document store.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a video record (the video collection is owned elsewhere; tests
    /// and local dev populate it directly).
    pub async fn insert_video(&self, video: Video) {
        self.inner.write().await.videos.insert(video.id, video);
    }

    /// Seed a subscription edge.
    pub async fn insert_subscription(&self, subscriber: Uuid, channel: Uuid) {
        self.inner
            .write()
            .await
            .subscriptions
            .push(Subscription {
                subscriber,
                channel,
            });
    }

    /// Append a video to a user's watch history (view order, duplicates
    /// allowed).
    pub async fn push_watch_history(&self, user_id: Uuid, video_id: Uuid) {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            user.watch_history.push(video_id);
        }
    }

    async fn mutate_user<F>(&self, id: Uuid, mutate: F) -> Result<Option<User>, AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };

        mutate(user);
        user.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let needle = username.trim().to_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == needle)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let needle = email.trim();
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == needle)
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError> {
        self.mutate_user(id, |user| {
            user.refresh_token = token.map(|t| t.to_string());
        })
        .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        new: &str,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };

        // Exact-match comparison under the write lock: of two concurrent
        // rotations with the same stale token, only one can pass this check.
        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }

        user.refresh_token = Some(new.to_string());
        user.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(true)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        self.mutate_user(id, |user| {
            user.password_hash = password_hash.to_string();
        })
        .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        self.mutate_user(id, |user| {
            user.full_name = full_name.to_string();
            user.email = email.to_string();
        })
        .await
    }

    async fn set_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>, AppError> {
        self.mutate_user(id, |user| {
            user.avatar_url = url.to_string();
        })
        .await
    }

    async fn set_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>, AppError> {
        self.mutate_user(id, |user| {
            user.cover_image_url = Some(url.to_string());
        })
        .await
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.inner.read().await.videos.get(&id).cloned())
    }

    async fn count_subscribers(&self, channel: Uuid) -> Result<u64, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.channel == channel)
            .count() as u64)
    }

    async fn count_subscriptions(&self, subscriber: Uuid) -> Result<u64, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.subscriber == subscriber)
            .count() as u64)
    }

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> Result<bool, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber && s.channel == channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new(
            "Carol",
            "c@x.com",
            "Carol C",
            "digest".to_string(),
            "https://media/a.png".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn test_username_lookup_is_case_insensitive() {
        let db = MemoryDb::new();
        let user = sample_user();
        db.create_user(&user).await.unwrap();

        let found = db.get_user_by_username("CAROL").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_requires_exact_match() {
        let db = MemoryDb::new();
        let user = sample_user();
        db.create_user(&user).await.unwrap();

        // No token stored yet: rotation must fail, not treat None loosely.
        assert!(!db.rotate_refresh_token(user.id, "old", "new").await.unwrap());

        db.set_refresh_token(user.id, Some("old")).await.unwrap();
        assert!(!db
            .rotate_refresh_token(user.id, "different", "new")
            .await
            .unwrap());
        assert!(db.rotate_refresh_token(user.id, "old", "new").await.unwrap());

        // The stale value has been superseded; a second racer loses.
        assert!(!db
            .rotate_refresh_token(user.id, "old", "newer")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_one_winner() {
        let db = MemoryDb::new();
        let user = sample_user();
        db.create_user(&user).await.unwrap();
        db.set_refresh_token(user.id, Some("stale")).await.unwrap();

        let a = db.rotate_refresh_token(user.id, "stale", "a");
        let b = db.rotate_refresh_token(user.id, "stale", "b");
        let (won_a, won_b) = tokio::join!(a, b);

        assert!(won_a.unwrap() ^ won_b.unwrap());
    }

    #[tokio::test]
    async fn test_logout_then_rotate_fails() {
        let db = MemoryDb::new();
        let user = sample_user();
        db.create_user(&user).await.unwrap();
        db.set_refresh_token(user.id, Some("live")).await.unwrap();

        db.set_refresh_token(user.id, None).await.unwrap();
        // Idempotent: clearing twice is harmless.
        db.set_refresh_token(user.id, None).await.unwrap();

        assert!(!db
            .rotate_refresh_token(user.id, "live", "new")
            .await
            .unwrap());
    }
}
