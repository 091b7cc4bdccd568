// SPDX-License-Identifier: MIT

//! Firestore implementation of the [`Database`] trait.
//!
//! Per-user mutations are read-modify-write on a single document; the
//! refresh-token compare-and-swap runs inside a Firestore transaction so a
//! concurrent rotation with the same stale token observes the mismatch.

use async_trait::async_trait;
use futures_util::FutureExt;
use uuid::Uuid;

use crate::db::{collections, Database};
use crate::error::AppError;
use crate::models::{Subscription, User, Video};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Write a user document (document ID = user ID).
    async fn write_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Read-modify-write a single user document.
    async fn mutate_user<F>(&self, id: Uuid, mutate: F) -> Result<Option<User>, AppError>
    where
        F: FnOnce(&mut User),
    {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };

        mutate(&mut user);
        user.updated_at = chrono::Utc::now().to_rfc3339();
        self.write_user(&user).await?;

        Ok(Some(user))
    }

    /// Find at most one user matching an equality filter on `field`.
    async fn find_user_by_field(
        &self,
        field: &'static str,
        value: String,
    ) -> Result<Option<User>, AppError> {
        let matches: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field(field).eq(value.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    /// Fetch subscription edges matching an equality filter on `field`.
    async fn subscriptions_by_field(
        &self,
        field: &'static str,
        value: String,
    ) -> Result<Vec<Subscription>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.field(field).eq(value.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl Database for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("username", username.trim().to_lowercase())
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("email", email.trim().to_string())
            .await
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.write_user(user).await
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
        // The read must go through the transaction-bound client so the
        // commit conflicts with any concurrent write to the same document.
        // On conflict `run_transaction` retries the whole closure; the
        // retry then reads the already-rotated token and fails the
        // exact-match check, so of two racers with the same stale token
        // exactly one returns true.
        let expected = expected.to_string();
        let new = new.to_string();
        self.client
            .run_transaction(|db, transaction| {
                let expected = expected.clone();
                let new = new.clone();
                async move {
                    let Some(mut user) = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj::<User>()
                        .one(id.to_string())
                        .await?
                    else {
                        return Ok(false);
                    };

                    // Exact-match comparison. A superseded or cleared token
                    // loses here.
                    if user.refresh_token.as_deref() != Some(expected.as_str()) {
                        return Ok(false);
                    }

                    user.refresh_token = Some(new.to_string());
                    user.updated_at = chrono::Utc::now().to_rfc3339();

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(user.id.to_string())
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Refresh token rotation failed: {}", e)))
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

    // ─── Video Operations ────────────────────────────────────────

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Subscription Operations ─────────────────────────────────

    async fn count_subscribers(&self, channel: Uuid) -> Result<u64, AppError> {
        let edges = self
            .subscriptions_by_field("channel", channel.to_string())
            .await?;
        Ok(edges.len() as u64)
    }

    async fn count_subscriptions(&self, subscriber: Uuid) -> Result<u64, AppError> {
        let edges = self
            .subscriptions_by_field("subscriber", subscriber.to_string())
            .await?;
        Ok(edges.len() as u64)
    }

    async fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> Result<bool, AppError> {
        let subscriber = subscriber.to_string();
        let channel = channel.to_string();

        let matches: Vec<Subscription> = self
            .client
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("subscriber").eq(subscriber.clone()),
                    q.field("channel").eq(channel.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(!matches.is_empty())
    }
}
