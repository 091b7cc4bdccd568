//! Video and subscription records.
//!
//! Both collections are owned elsewhere; this service only reads them for
//! the watch-history and channel-profile aggregations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Video stored in the `videos` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Document ID
    pub id: Uuid,
    /// URL of the hosted video file
    pub video_file: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Owning user's ID
    pub owner: Uuid,
    pub title: String,
    pub description: String,
    /// Duration in seconds
    pub duration: f64,
    /// View counter
    pub views: u64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Directed subscription edge: `subscriber` follows `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber: Uuid,
    pub channel: Uuid,
}
