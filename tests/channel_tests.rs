// SPDX-License-Identifier: MIT

//! Channel-profile and watch-history aggregation tests.

use axum::http::StatusCode;
use uuid::Uuid;

mod common;

use common::{body_json, create_test_app, get, seed_user};
use vidstream::models::{User, Video};

fn video(owner: &User, title: &str) -> Video {
    let now = chrono::Utc::now().to_rfc3339();
    Video {
        id: Uuid::new_v4(),
        video_file: format!("https://media.test/{title}.mp4"),
        thumbnail: format!("https://media.test/{title}.jpg"),
        owner: owner.id,
        title: title.to_string(),
        description: "a video".to_string(),
        duration: 42.5,
        views: 7,
        is_published: true,
        created_at: now.clone(),
        updated_at: now,
    }
}

#[tokio::test]
async fn test_channel_profile_unknown_username_is_not_found() {
    let t = create_test_app();
    let response = get(&t.app, "/channel/ghost", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["statusCode"], 404);
}

#[tokio::test]
async fn test_channel_profile_counts_and_projection() {
    let t = create_test_app();
    let alice = seed_user(&t.db, "alice", "a@x.com", "p1").await;
    let bob = seed_user(&t.db, "bob", "b@x.com", "p2").await;
    let carol = seed_user(&t.db, "carol", "c@x.com", "p3").await;

    // bob and carol subscribe to alice; alice subscribes to bob.
    t.db.insert_subscription(bob.id, alice.id).await;
    t.db.insert_subscription(carol.id, alice.id).await;
    t.db.insert_subscription(alice.id, bob.id).await;

    let json = body_json(get(&t.app, "/channel/alice", None).await).await;
    let data = json["data"].as_object().unwrap();

    assert_eq!(data["username"], "alice");
    assert_eq!(data["subscriberCount"], 2);
    assert_eq!(data["subscribedToCount"], 1);
    assert_eq!(data["isSubscribed"], false);

    // Only the projected fields appear.
    let mut keys: Vec<_> = data.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "avatarUrl",
            "coverImageUrl",
            "fullName",
            "isSubscribed",
            "subscribedToCount",
            "subscriberCount",
            "username",
        ]
    );
}

#[tokio::test]
async fn test_channel_profile_is_subscribed_reflects_the_viewer() {
    let t = create_test_app();
    let alice = seed_user(&t.db, "alice", "a@x.com", "p1").await;
    let bob = seed_user(&t.db, "bob", "b@x.com", "p2").await;
    let carol = seed_user(&t.db, "carol", "c@x.com", "p3").await;
    t.db.insert_subscription(bob.id, alice.id).await;

    let bob_token = t.state.tokens.issue_access(bob.id).unwrap();
    let json = body_json(get(&t.app, "/channel/alice", Some(&bob_token)).await).await;
    assert_eq!(json["data"]["isSubscribed"], true);

    let carol_token = t.state.tokens.issue_access(carol.id).unwrap();
    let json = body_json(get(&t.app, "/channel/alice", Some(&carol_token)).await).await;
    assert_eq!(json["data"]["isSubscribed"], false);
}

#[tokio::test]
async fn test_channel_profile_resolution_is_case_insensitive() {
    let t = create_test_app();
    seed_user(&t.db, "alice", "a@x.com", "p1").await;

    let response = get(&t.app, "/channel/ALICE", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "alice");
}

#[tokio::test]
async fn test_channel_profile_garbage_viewer_token_means_anonymous() {
    let t = create_test_app();
    seed_user(&t.db, "alice", "a@x.com", "p1").await;

    let response = get(&t.app, "/channel/alice", Some("garbage-token")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["isSubscribed"], false);
}

#[tokio::test]
async fn test_watch_history_requires_authentication() {
    let t = create_test_app();
    let response = get(&t.app, "/watch-history", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_watch_history_is_an_empty_sequence() {
    let t = create_test_app();
    let alice = seed_user(&t.db, "alice", "a@x.com", "p1").await;
    let access = t.state.tokens.issue_access(alice.id).unwrap();

    let response = get(&t.app, "/watch-history", Some(&access)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_watch_history_preserves_view_order_and_duplicates() {
    let t = create_test_app();
    let alice = seed_user(&t.db, "alice", "a@x.com", "p1").await;
    let bob = seed_user(&t.db, "bob", "b@x.com", "p2").await;

    let first = video(&bob, "first");
    let second = video(&bob, "second");
    t.db.insert_video(first.clone()).await;
    t.db.insert_video(second.clone()).await;

    // Watched: second, first, second again.
    t.db.push_watch_history(alice.id, second.id).await;
    t.db.push_watch_history(alice.id, first.id).await;
    t.db.push_watch_history(alice.id, second.id).await;

    let access = t.state.tokens.issue_access(alice.id).unwrap();
    let json = body_json(get(&t.app, "/watch-history", Some(&access)).await).await;

    let titles: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["second", "first", "second"]);
}

#[tokio::test]
async fn test_watch_history_joins_only_public_owner_fields() {
    let t = create_test_app();
    let alice = seed_user(&t.db, "alice", "a@x.com", "p1").await;
    let bob = seed_user(&t.db, "bob", "b@x.com", "p2").await;

    let clip = video(&bob, "clip");
    t.db.insert_video(clip.clone()).await;
    t.db.push_watch_history(alice.id, clip.id).await;

    let access = t.state.tokens.issue_access(alice.id).unwrap();
    let json = body_json(get(&t.app, "/watch-history", Some(&access)).await).await;

    let entry = &json["data"][0];
    assert_eq!(entry["title"], "clip");
    assert_eq!(entry["duration"], 42.5);

    let owner = entry["owner"].as_object().unwrap();
    let mut keys: Vec<_> = owner.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["avatarUrl", "fullName", "username"]);
    assert_eq!(owner["username"], "bob");
}

#[tokio::test]
async fn test_watch_history_skips_dangling_video_references() {
    let t = create_test_app();
    let alice = seed_user(&t.db, "alice", "a@x.com", "p1").await;
    let bob = seed_user(&t.db, "bob", "b@x.com", "p2").await;

    let clip = video(&bob, "clip");
    t.db.insert_video(clip.clone()).await;
    t.db.push_watch_history(alice.id, Uuid::new_v4()).await; // deleted video
    t.db.push_watch_history(alice.id, clip.id).await;

    let access = t.state.tokens.issue_access(alice.id).unwrap();
    let json = body_json(get(&t.app, "/watch-history", Some(&access)).await).await;

    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["title"], "clip");
}
