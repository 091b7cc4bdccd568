// SPDX-License-Identifier: MIT

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use vidstream::config::Config;
use vidstream::db::{Database, MemoryDb};
use vidstream::error::AppError;
use vidstream::models::User;
use vidstream::routes::create_router;
use vidstream::services::{password, MediaStore, StoredMedia, TokenService};
use vidstream::AppState;

/// How the mock media host behaves.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub enum MediaBehavior {
    Succeed,
    FailAll,
    /// Succeed for the first `n` calls, fail afterwards.
    FailAfter(usize),
}

/// Media host double: records calls, returns canned URLs or failures.
pub struct MockMediaStore {
    behavior: Mutex<MediaBehavior>,
    calls: AtomicUsize,
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(MediaBehavior::Succeed),
            calls: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn set_behavior(&self, behavior: MediaBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for MockMediaStore {
    async fn store(&self, local_path: &Path) -> Result<StoredMedia, AppError> {
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock().unwrap();

        let fail = match behavior {
            MediaBehavior::Succeed => false,
            MediaBehavior::FailAll => true,
            MediaBehavior::FailAfter(n) => call_index >= n,
        };
        if fail {
            return Err(AppError::Upload("mock media host failure".to_string()));
        }

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        Ok(StoredMedia {
            url: format!("https://media.test/{}", file_name),
        })
    }
}

/// Everything a flow test needs: the router plus direct handles to the
/// in-memory store and the media mock.
pub struct TestApp {
    pub app: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub media: Arc<MockMediaStore>,
}

/// Create a test app over the in-memory store and a mock media host.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let db = Arc::new(MemoryDb::new());
    let media = Arc::new(MockMediaStore::new());
    let tokens = TokenService::new(&config);

    let state = Arc::new(AppState {
        config,
        db: db.clone(),
        media: media.clone(),
        tokens,
    });

    TestApp {
        app: create_router(state.clone()),
        state,
        db,
        media,
    }
}

/// Seed a user directly in the store with a real password hash.
#[allow(dead_code)]
pub async fn seed_user(db: &MemoryDb, username: &str, email: &str, plaintext: &str) -> User {
    let user = User::new(
        username,
        email,
        "Seeded User",
        password::hash_password(plaintext).unwrap(),
        "https://media.test/avatar.png".to_string(),
        None,
    );
    db.create_user(&user).await.unwrap();
    user
}

// ─── Request helpers ─────────────────────────────────────────────

pub const BOUNDARY: &str = "vidstream-test-boundary";

/// Build a multipart/form-data body from text fields and files.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub async fn post_multipart(
    app: &axum::Router,
    uri: &str,
    body: Vec<u8>,
) -> Response<axum::body::Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST a JSON body, optionally with a bearer access token.
#[allow(dead_code)]
pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
    bearer: Option<&str>,
) -> Response<axum::body::Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn get(
    app: &axum::Router,
    uri: &str,
    bearer: Option<&str>,
) -> Response<axum::body::Body> {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Collect a response body into JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<axum::body::Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<axum::body::Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}
